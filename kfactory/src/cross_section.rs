//! Cross sections: the layer stack around a route.

use arcstr::ArcStr;
use laydb::LayerInfo;

use crate::error::{Error, Result};

/// A section of a cross section on a secondary layer: `(layer, dmin, dmax)`
/// distances from the route center, in dbu.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// The layer the section sits on.
    pub layer: LayerInfo,
    /// The inner distance from the main layer edge, if any.
    pub d_min: Option<i64>,
    /// The outer distance from the main layer edge.
    pub d_max: i64,
}

/// A bounding-box section: `(layer, left, bottom, right, top)` margins in
/// dbu.
#[derive(Debug, Clone, PartialEq)]
pub struct BboxSection {
    /// The layer the section sits on.
    pub layer: LayerInfo,
    /// Margins `(left, bottom, right, top)`.
    pub margins: (i64, i64, i64, i64),
}

/// A validated, registered cross section.
///
/// Obtained through [`KCLayout::get_cross_section`]
/// (crate::layout::KCLayout::get_cross_section); equal names refer to the
/// same entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// The unique name of the cross section.
    pub name: ArcStr,
    /// The main routing layer.
    pub main_layer: LayerInfo,
    /// The width of the main section, in dbu.
    pub width: i64,
    /// Secondary sections around the main layer.
    pub sections: Vec<Section>,
    /// Bounding-box sections.
    pub bbox_sections: Vec<BboxSection>,
}

impl CrossSection {
    /// Half the total extent of the cross section beyond the route center.
    pub fn xmax(&self) -> i64 {
        self.width / 2
            + self
                .sections
                .iter()
                .map(|s| s.d_max)
                .max()
                .unwrap_or(0)
    }
}

/// A cross-section specification in dbu, validated and deduplicated on
/// registration.
#[derive(Debug, Clone, Default)]
pub struct CrossSectionSpec {
    /// An explicit name. When omitted, the deterministic
    /// `"{enclosure}_{width}"` name is derived.
    pub name: Option<ArcStr>,
    /// The enclosure name used for derived naming.
    pub enclosure: Option<ArcStr>,
    /// The main routing layer.
    pub main_layer: LayerInfo,
    /// The width of the main section, in dbu.
    pub width: i64,
    /// Secondary sections.
    pub sections: Vec<Section>,
    /// Bounding-box sections.
    pub bbox_sections: Vec<BboxSection>,
}

impl CrossSectionSpec {
    pub(crate) fn validate(self, _dbu: f64) -> Result<CrossSection> {
        if self.width <= 0 {
            return Err(Error::CrossSection("width must be greater than 0".into()));
        }
        if self.width % 2 != 0 {
            return Err(Error::CrossSection(
                "width must be a multiple of 2 to keep extrusions symmetrical".into(),
            ));
        }
        let name = self.name.unwrap_or_else(|| {
            let enclosure = self
                .enclosure
                .unwrap_or_else(|| match &self.main_layer.name {
                    Some(name) => name.clone(),
                    None => {
                        format!("{}_{}", self.main_layer.layer, self.main_layer.datatype).into()
                    }
                });
            format!("{}_{}", enclosure, self.width).into()
        });
        Ok(CrossSection {
            name,
            main_layer: self.main_layer,
            width: self.width,
            sections: self.sections,
            bbox_sections: self.bbox_sections,
        })
    }
}

/// A cross-section specification in microns, converted on registration.
#[derive(Debug, Clone, Default)]
pub struct DCrossSectionSpec {
    /// An explicit name.
    pub name: Option<ArcStr>,
    /// The enclosure name used for derived naming.
    pub enclosure: Option<ArcStr>,
    /// The main routing layer.
    pub main_layer: LayerInfo,
    /// The width of the main section, in microns.
    pub width: f64,
    /// Secondary sections, `(layer, dmin, dmax)` in microns.
    pub dsections: Vec<(LayerInfo, Option<f64>, f64)>,
}

impl DCrossSectionSpec {
    /// Converts to the dbu-based spec.
    pub fn to_itype(&self, dbu: f64) -> CrossSectionSpec {
        let to_dbu = |x: f64| (x / dbu).round() as i64;
        CrossSectionSpec {
            name: self.name.clone(),
            enclosure: self.enclosure.clone(),
            main_layer: self.main_layer.clone(),
            width: to_dbu(self.width),
            sections: self
                .dsections
                .iter()
                .map(|(layer, d_min, d_max)| Section {
                    layer: layer.clone(),
                    d_min: d_min.map(to_dbu),
                    d_max: to_dbu(*d_max),
                })
                .collect(),
            bbox_sections: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::KCLayout;

    #[test]
    fn registration_dedups_by_name() {
        let mut kcl = KCLayout::default();
        let spec = CrossSectionSpec {
            enclosure: Some("WGSTD".into()),
            main_layer: LayerInfo::new(1, 0),
            width: 1000,
            ..Default::default()
        };
        let name = kcl.get_cross_section(spec.clone()).unwrap().name.clone();
        assert_eq!(name.as_str(), "WGSTD_1000");
        let again = kcl.get_cross_section(spec).unwrap();
        assert_eq!(again.name, name);
    }

    #[test]
    fn validation_rejects_bad_widths() {
        let mut kcl = KCLayout::default();
        let err = kcl
            .get_cross_section(CrossSectionSpec {
                main_layer: LayerInfo::new(1, 0),
                width: 0,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::CrossSection(_)));
        let err = kcl
            .get_cross_section(CrossSectionSpec {
                main_layer: LayerInfo::new(1, 0),
                width: 1001,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::CrossSection(_)));
    }

    #[test]
    fn um_spec_converts_to_dbu() {
        let spec = DCrossSectionSpec {
            main_layer: LayerInfo::new(1, 0),
            width: 0.5,
            dsections: vec![(LayerInfo::new(111, 0), None, 1.0)],
            ..Default::default()
        };
        let ispec = spec.to_itype(0.001);
        assert_eq!(ispec.width, 500);
        assert_eq!(ispec.sections[0].d_max, 1000);
    }
}
