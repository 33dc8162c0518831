//! Instances: placed references to cells, and their derived ports.

use arcstr::ArcStr;
use geometry::rect::Rect;
use geometry::transform::{DCplxTrans, Trans};
use laydb::{CellId, InstTrans};

use crate::error::{Error, Result};
use crate::layout::KCLayout;
use crate::port::{Port, Ports};

/// A placed reference to a cell inside a parent cell.
///
/// Lightweight handle; all state lives in the registry. Instances are
/// never detached and are destroyed with their parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Instance {
    /// The parent cell holding the instance.
    pub parent: CellId,
    /// The index of the instance within the parent.
    pub index: usize,
}

/// The target of a [`connect`](KCLayout::connect): either an absolute port
/// or a named port of another instance.
#[derive(Debug, Clone)]
pub enum ConnectTarget<'a> {
    /// An absolute port.
    Port(&'a Port),
    /// A named port on another instance of the same parent cell.
    Inst(Instance, &'a str),
}

impl<'a> From<&'a Port> for ConnectTarget<'a> {
    fn from(value: &'a Port) -> Self {
        ConnectTarget::Port(value)
    }
}

impl<'a> From<(Instance, &'a str)> for ConnectTarget<'a> {
    fn from(value: (Instance, &'a str)) -> Self {
        ConnectTarget::Inst(value.0, value.1)
    }
}

/// Options relaxing the port compatibility checks of `connect`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Use a mirroring connection transform (`M90`) instead of `R180`.
    pub mirror: bool,
    /// Skip the width check.
    pub allow_width_mismatch: bool,
    /// Skip the layer check.
    pub allow_layer_mismatch: bool,
    /// Skip the port-type check.
    pub allow_type_mismatch: bool,
}

impl KCLayout {
    /// Places an instance of `cell` inside `parent` with a simple
    /// transformation.
    pub fn create_inst(&mut self, parent: CellId, cell: CellId, trans: Trans) -> Result<Instance> {
        let index = self.insert_inst(parent, cell, InstTrans::Simple(trans))?;
        Ok(Instance { parent, index })
    }

    /// Places an instance with a complex transformation.
    pub fn create_inst_cplx(
        &mut self,
        parent: CellId,
        cell: CellId,
        trans: DCplxTrans,
    ) -> Result<Instance> {
        let index = self.insert_inst(parent, cell, InstTrans::Cplx(trans))?;
        Ok(Instance { parent, index })
    }

    /// The cell an instance refers to.
    pub fn instance_cell(&self, inst: Instance) -> CellId {
        self.raw_inst(inst.parent, inst.index).child
    }

    /// The transformation of an instance.
    pub fn instance_trans(&self, inst: Instance) -> InstTrans {
        self.raw_inst(inst.parent, inst.index).trans
    }

    /// Whether the instance carries a complex transformation.
    pub fn instance_is_complex(&self, inst: Instance) -> bool {
        self.instance_trans(inst).is_complex()
    }

    /// The bounding box of an instance in parent coordinates.
    pub fn instance_bbox(&self, inst: Instance) -> Option<Rect> {
        let child = self.instance_cell(inst);
        let trans = self.instance_trans(inst).s_trans(self.dbu());
        self.bbox(child).map(|b| b.transformed(trans))
    }

    /// Post-composes `trans` onto an instance's transformation.
    pub fn transform_instance(&mut self, inst: Instance, trans: Trans) -> Result<()> {
        self.kcell(inst.parent).check_unlocked()?;
        let new = match self.instance_trans(inst) {
            InstTrans::Simple(t) => InstTrans::Simple(trans * t),
            InstTrans::Cplx(t) => InstTrans::Cplx(trans.to_dcplx(self.dbu()) * t),
        };
        self.set_inst_trans(inst.parent, inst.index, new);
        Ok(())
    }

    /// A SHA3-512 digest of an instance: the child cell hash and the
    /// instance transformation.
    pub fn instance_hash(&self, inst: Instance) -> [u8; 64] {
        self.instance_hash_raw(inst.parent, inst.index)
    }

    /// The derived port of an instance: the child cell's port under the
    /// instance transformation.
    ///
    /// A complex instance yields a complex port regardless of the child
    /// port's representation.
    pub fn instance_port(&self, inst: Instance, name: &str) -> Result<Port> {
        let child = self.instance_cell(inst);
        let port = self.kcell(child).port(name)?;
        Ok(self.derive_port(inst, port))
    }

    /// All derived ports of an instance, in the child's insertion order.
    pub fn instance_ports(&self, inst: Instance) -> Vec<Port> {
        let child = self.instance_cell(inst);
        self.kcell(child)
            .ports()
            .iter()
            .map(|p| self.derive_port(inst, p))
            .collect()
    }

    /// The derived ports as a [`Ports`] collection.
    ///
    /// Fails for complex instances, whose derived ports cannot be
    /// represented simply.
    pub fn instance_ports_collection(&self, inst: Instance) -> Result<Ports> {
        if self.instance_is_complex(inst) {
            return Err(Error::Routing(format!(
                "cannot copy the port collection of a complex instance of `{}`",
                self.kcell(self.instance_cell(inst)).name()
            )));
        }
        let mut ports = Ports::new();
        for port in self.instance_ports(inst) {
            ports.create_port(port)?;
        }
        Ok(ports)
    }

    fn derive_port(&self, inst: Instance, port: &Port) -> Port {
        let dbu = self.dbu();
        match self.instance_trans(inst) {
            InstTrans::Simple(t) => port.copy(t, dbu),
            InstTrans::Cplx(t) => port.copy_cplx(t, dbu),
        }
    }

    /// Transforms the instance so that its port `portname` coincides with
    /// the target port, rotated 180 degrees (or mirrored with
    /// `opts.mirror`).
    ///
    /// Width, layer, and type checks fire before any mutation; a failed
    /// connect leaves the instance transformation unchanged. Complex or
    /// micron operands promote the whole chain into complex micron space.
    pub fn connect<'a>(
        &mut self,
        inst: Instance,
        portname: &str,
        other: impl Into<ConnectTarget<'a>>,
        opts: ConnectOptions,
    ) -> Result<()> {
        self.kcell(inst.parent).check_unlocked()?;
        let (op, other_cell_name) = self.resolve_target(other.into())?;
        let child = self.instance_cell(inst);
        let p = self.kcell(child).port(portname)?.clone();
        let cell_name = self.kcell(child).name().clone();

        self.check_port_compat(&p, &op, &cell_name, &other_cell_name, opts)?;

        let dbu = self.dbu();
        let simple = !p.trans.is_complex()
            && !op.trans.is_complex()
            && p.trans.int_based()
            && op.trans.int_based();
        let conn = if opts.mirror { Trans::M90 } else { Trans::R180 };
        let new = if simple {
            let op_t = op.trans.s_trans(dbu);
            let p_t = p.trans.s_trans(dbu);
            InstTrans::Simple(op_t * conn * p_t.inverted())
        } else {
            // promote the whole chain into complex micron space
            let d_conn = if opts.mirror {
                DCplxTrans::M90
            } else {
                DCplxTrans::R180
            };
            InstTrans::Cplx(op.trans.dcplx(dbu) * d_conn * p.trans.dcplx(dbu).inverted())
        };
        self.set_inst_trans(inst.parent, inst.index, new);
        Ok(())
    }

    /// Like [`connect`](KCLayout::connect), but always computes the
    /// transformation in complex micron space.
    ///
    /// Width mismatches that vanish under unit conversion are accepted.
    pub fn connect_cplx<'a>(
        &mut self,
        inst: Instance,
        portname: &str,
        other: impl Into<ConnectTarget<'a>>,
        opts: ConnectOptions,
    ) -> Result<()> {
        self.kcell(inst.parent).check_unlocked()?;
        let (op, other_cell_name) = self.resolve_target(other.into())?;
        let child = self.instance_cell(inst);
        let p = self.kcell(child).port(portname)?.clone();
        let cell_name = self.kcell(child).name().clone();

        self.check_port_compat(&p, &op, &cell_name, &other_cell_name, opts)?;

        let dbu = self.dbu();
        let conn = if opts.mirror {
            DCplxTrans::M90
        } else {
            DCplxTrans::R180
        };
        let new = op.trans.dcplx(dbu) * conn * p.trans.dcplx(dbu).inverted();
        self.set_inst_trans(inst.parent, inst.index, InstTrans::Cplx(new));
        Ok(())
    }

    fn resolve_target(&self, target: ConnectTarget<'_>) -> Result<(Port, ArcStr)> {
        match target {
            ConnectTarget::Port(port) => Ok((port.clone(), arcstr::literal!("Port"))),
            ConnectTarget::Inst(other, name) => {
                let port = self.instance_port(other, name)?;
                let cell = self.kcell(self.instance_cell(other)).name().clone();
                Ok((port, cell))
            }
        }
    }

    fn check_port_compat(
        &self,
        p: &Port,
        op: &Port,
        cell: &ArcStr,
        other_cell: &ArcStr,
        opts: ConnectOptions,
    ) -> Result<()> {
        if p.width != op.width && !opts.allow_width_mismatch {
            return Err(Error::PortWidthMismatch {
                cell: cell.clone(),
                port: p.name.clone(),
                other_cell: other_cell.clone(),
                other_port: op.name.clone(),
                width: p.width,
                other_width: op.width,
            });
        }
        if p.layer != op.layer && !opts.allow_layer_mismatch {
            return Err(Error::PortLayerMismatch {
                cell: cell.clone(),
                port: p.name.clone(),
                other_cell: other_cell.clone(),
                other_port: op.name.clone(),
                layer: self.get_info(p.layer).to_string(),
                other_layer: self.get_info(op.layer).to_string(),
            });
        }
        if p.port_type != op.port_type && !opts.allow_type_mismatch {
            return Err(Error::PortTypeMismatch {
                cell: cell.clone(),
                port: p.name.clone(),
                other_cell: other_cell.clone(),
                other_port: op.name.clone(),
                port_type: p.port_type.clone(),
                other_port_type: op.port_type.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::KCLayout;
    use crate::port::PortTrans;

    fn straight_cell(kcl: &mut KCLayout, name: &str, width: i64) -> CellId {
        let cell = kcl.create_cell(name, false).unwrap();
        let layer = kcl.layer(1, 0);
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), width, layer))
            .unwrap();
        kcl.kcell_mut(cell)
            .create_port(Port::at("o2", 0, (10_000, 0), width, layer))
            .unwrap();
        cell
    }

    #[test]
    fn connect_aligns_ports_face_to_face() {
        let mut kcl = KCLayout::default();
        let wg = straight_cell(&mut kcl, "wg", 500);
        let top = kcl.create_cell("top", false).unwrap();
        let a = kcl.create_inst(top, wg, Trans::R0).unwrap();
        let b = kcl.create_inst(top, wg, Trans::R0).unwrap();
        kcl.connect(b, "o1", (a, "o2"), ConnectOptions::default())
            .unwrap();
        let a_o2 = kcl.instance_port(a, "o2").unwrap();
        let b_o1 = kcl.instance_port(b, "o1").unwrap();
        let dbu = kcl.dbu();
        // connected ports coincide and face each other
        assert_eq!(a_o2.center(dbu), b_o1.center(dbu));
        assert_eq!((a_o2.angle(dbu) + 2) % 4, b_o1.angle(dbu));
        // the algebra: trans == op * R180 * p^-1
        let expected = a_o2.trans.s_trans(dbu)
            * Trans::R180
            * Trans::new(2, false, 0, 0).inverted();
        assert_eq!(kcl.instance_trans(b).s_trans(dbu), expected);
    }

    #[test]
    fn width_mismatch_fails_before_mutation() {
        let mut kcl = KCLayout::default();
        let narrow = straight_cell(&mut kcl, "narrow", 500);
        let wide = straight_cell(&mut kcl, "wide", 1000);
        let top = kcl.create_cell("top", false).unwrap();
        let a = kcl
            .create_inst(top, narrow, Trans::new(0, false, 123, 456))
            .unwrap();
        let b = kcl.create_inst(top, wide, Trans::R0).unwrap();
        let before = kcl.instance_trans(a);
        let err = kcl
            .connect(a, "o2", (b, "o1"), ConnectOptions::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("narrow"), "{message}");
        assert!(message.contains("wide"), "{message}");
        assert!(message.contains("500") && message.contains("1000"), "{message}");
        // failed connect leaves the transformation unchanged
        assert_eq!(kcl.instance_trans(a), before);
    }

    #[test]
    fn mismatches_can_be_allowed() {
        let mut kcl = KCLayout::default();
        let narrow = straight_cell(&mut kcl, "narrow", 500);
        let wide = straight_cell(&mut kcl, "wide", 1000);
        let top = kcl.create_cell("top", false).unwrap();
        let a = kcl.create_inst(top, narrow, Trans::R0).unwrap();
        let b = kcl.create_inst(top, wide, Trans::R0).unwrap();
        kcl.connect(
            a,
            "o2",
            (b, "o1"),
            ConnectOptions {
                allow_width_mismatch: true,
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn complex_target_promotes_the_chain() {
        let mut kcl = KCLayout::default();
        let wg = straight_cell(&mut kcl, "wg", 500);
        let top = kcl.create_cell("top", false).unwrap();
        let inst = kcl.create_inst(top, wg, Trans::R0).unwrap();
        let layer = kcl.layer(1, 0);
        let target = Port {
            name: "ext".into(),
            width: 500,
            layer,
            port_type: crate::port::optical(),
            trans: PortTrans::UmCplx(DCplxTrans::new(1., 30., false, 5., 5.)),
        };
        kcl.connect(inst, "o1", &target, ConnectOptions::default())
            .unwrap();
        assert!(kcl.instance_is_complex(inst));
        // the derived port of a complex instance is complex
        let derived = kcl.instance_port(inst, "o1").unwrap();
        assert!(derived.trans.is_complex());
        let t = derived.trans.dcplx(kcl.dbu());
        approx::assert_relative_eq!(t.disp.x, 5., epsilon = 1e-9);
        approx::assert_relative_eq!(t.disp.y, 5., epsilon = 1e-9);
    }

    #[test]
    fn instances_of_locked_cells_still_connect() {
        // locking the child must not prevent placing/connecting instances
        // in an open parent
        let mut kcl = KCLayout::default();
        let wg = straight_cell(&mut kcl, "wg", 500);
        kcl.lock(wg);
        let top = kcl.create_cell("top", false).unwrap();
        let a = kcl.create_inst(top, wg, Trans::R0).unwrap();
        let b = kcl.create_inst(top, wg, Trans::R0).unwrap();
        kcl.connect(b, "o1", (a, "o2"), ConnectOptions::default())
            .unwrap();
    }
}
