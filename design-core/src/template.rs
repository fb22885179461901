//! Design templates authored at a canonical workspace size.
//!
//! Templates are serialized scene documents plus a name and orientation.
//! Instantiating one remaps its elements onto the target workspace and gives
//! every element a fresh identifier.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId};
use crate::scaling::{self, ScaleFactors};
use crate::scene::{Orientation, Workspace};
use crate::schema::SceneDocument;
use crate::{CanvasError, CanvasResult};

/// Wire shape: template metadata with the scene document fields inline.
#[derive(Deserialize)]
struct RawTemplate {
    name: String,
    #[serde(default)]
    orientation: Orientation,
    #[serde(flatten)]
    scene: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawTemplate> for Template {
    type Error = serde_json::Error;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        let mut scene = raw.scene;
        // Without an explicit size the document is authored at the canonical
        // size for the template's orientation.
        scene
            .entry("orientation")
            .or_insert(serde_json::to_value(raw.orientation)?);
        let document = serde_json::from_value(serde_json::Value::Object(scene))?;
        Ok(Self {
            name: raw.name,
            orientation: raw.orientation,
            document,
        })
    }
}

/// A named design authored at a fixed size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    /// Display name, unique within a catalog.
    pub name: String,
    /// Orientation the template is designed for.
    pub orientation: Orientation,
    /// Elements and authored canvas size.
    #[serde(flatten)]
    pub document: SceneDocument,
}

impl Template {
    /// Pixel size the template's geometry is expressed in.
    #[must_use]
    pub fn authored_size(&self) -> (f64, f64) {
        (self.document.canvas_size.width, self.document.canvas_size.height)
    }

    /// Background colour the template asks for.
    #[must_use]
    pub fn background_color(&self) -> &str {
        &self.document.background_color
    }

    /// Produce fresh, unlocked elements laid out for `workspace`.
    ///
    /// Scaling is skipped when both factors are within `tolerance` of 1.0.
    ///
    /// # Errors
    ///
    /// Returns an error if the authored or target size is degenerate.
    pub fn instantiate(&self, workspace: &Workspace, tolerance: f64) -> CanvasResult<Vec<Element>> {
        let target = (workspace.width, workspace.height);
        let factors = ScaleFactors::between(self.authored_size(), target).ok_or(
            CanvasError::InvalidWorkspace {
                width: workspace.width,
                height: workspace.height,
            },
        )?;

        let mut elements = self.document.to_elements();
        for element in &mut elements {
            element.id = ElementId::new();
            element.locked = false;
        }
        scaling::scale_elements(elements.iter_mut(), factors, tolerance);
        tracing::debug!(
            "Instantiated template {:?} ({} elements, factors {:?})",
            self.name,
            elements.len(),
            factors
        );
        Ok(elements)
    }
}

/// A searchable list of templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    /// Create a catalog from a list of templates.
    #[must_use]
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// Parse a JSON array of templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an array of templates.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find a template by name.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::TemplateNotFound`] if no template has that name.
    pub fn get(&self, name: &str) -> CanvasResult<&Template> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CanvasError::TemplateNotFound(name.to_string()))
    }

    /// Templates designed for an orientation.
    pub fn for_orientation(&self, orientation: Orientation) -> impl Iterator<Item = &Template> {
        self.templates
            .iter()
            .filter(move |t| t.orientation == orientation)
    }

    /// All templates.
    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::scaling::IDENTITY_TOLERANCE;

    const CATALOG: &str = r##"[
        {
            "name": "Grand Opening",
            "orientation": "landscape",
            "backgroundColor": "#ffcc00",
            "elements": [
                {"id": "bg", "type": "rect", "x": 0, "y": 0, "width": 600, "height": 1200, "locked": true},
                {"id": "title", "type": "text", "x": 1200, "y": 300, "text": "GRAND OPENING", "fontSize": 120}
            ]
        },
        {
            "name": "Tall Sale",
            "orientation": "portrait",
            "elements": [{"type": "circle", "x": 400, "y": 800, "radius": 200}]
        }
    ]"##;

    #[test]
    fn test_catalog_parses_and_defaults_size_from_orientation() {
        let catalog = TemplateCatalog::from_json(CATALOG).expect("catalog");
        assert_eq!(catalog.templates().len(), 2);
        let tall = catalog.get("Tall Sale").expect("template");
        assert_eq!(tall.authored_size(), (800.0, 1600.0));
        assert_eq!(catalog.for_orientation(Orientation::Landscape).count(), 1);
        assert!(matches!(catalog.get("Nope"), Err(CanvasError::TemplateNotFound(_))));
    }

    #[test]
    fn test_instantiate_scales_to_workspace() {
        let catalog = TemplateCatalog::from_json(CATALOG).expect("catalog");
        let template = catalog.get("Grand Opening").expect("template");
        let elements = template
            .instantiate(&Workspace::new(1600.0, 800.0), IDENTITY_TOLERANCE)
            .expect("instantiate");

        let ElementKind::Rectangle { width, height, .. } = elements[0].kind else {
            panic!("expected rectangle");
        };
        assert!(elements[0].x.abs() < 1e-9 && elements[0].y.abs() < 1e-9);
        assert!((width - 400.0).abs() < 1e-9);
        assert!((height - 800.0).abs() < 1e-9);
        assert!(!elements[0].locked);
        assert_ne!(elements[0].id.as_str(), "bg");
        assert_eq!(template.background_color(), "#ffcc00");
    }

    #[test]
    fn test_instantiate_never_reuses_ids() {
        let catalog = TemplateCatalog::from_json(CATALOG).expect("catalog");
        let template = catalog.get("Tall Sale").expect("template");
        let workspace = Workspace::canonical(Orientation::Portrait);
        let first = template.instantiate(&workspace, IDENTITY_TOLERANCE).expect("first");
        let second = template.instantiate(&workspace, IDENTITY_TOLERANCE).expect("second");
        assert_ne!(first[0].id, second[0].id);
        // Canonical size is the identity: geometry is untouched.
        assert!(matches!(first[0].kind, ElementKind::Circle { radius } if (radius - 200.0).abs() < f64::EPSILON));
    }
}
