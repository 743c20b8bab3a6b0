//! Serialized view of the host chart page.
//!
//! The host page exposes no data API, so a browser-side bridge serializes what
//! is rendered: text-bearing elements in document order and the pixel surfaces
//! of the chart canvases. Every lookup in this module degrades to `None` or an
//! empty result; nothing here fails on a page whose structure has drifted.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CoreError, ValidationError};

/// One rendered element with its visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageElement {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
}

impl PageElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A rendered pixel surface (canvas).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, row-major. `None` when the surface has no readable 2d
    /// context (e.g. a WebGL canvas or a tainted one).
    #[serde(default, with = "rgba_base64", skip_serializing_if = "Option::is_none")]
    pub pixels: Option<Vec<u8>>,
}

impl Surface {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ValidationError> {
        let expected = expected_len(width, height);
        if pixels.len() != expected {
            return Err(ValidationError::PixelBufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: Some(pixels),
            ..Self::default()
        })
    }

    /// A surface whose pixel data cannot be read.
    pub fn unreadable(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Readable pixel view, or `None` when the buffer is absent or does not
    /// match the declared dimensions.
    pub fn pixel_view(&self) -> Option<PixelView<'_>> {
        let data = self.pixels.as_deref()?;
        let expected = expected_len(self.width, self.height);
        if self.width == 0 || self.height == 0 || data.len() != expected {
            return None;
        }

        Some(PixelView {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

/// Borrowed RGBA pixel grid with validated dimensions.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    pub width: u32,
    pub height: u32,
    data: &'a [u8],
}

impl PixelView<'_> {
    /// RGBA at column `x`, row `y`. Callers stay within `width`/`height`.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }
}

/// Snapshot of the rendered host page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<PageElement>,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
}

impl PageSnapshot {
    pub fn from_json(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn with_element(mut self, element: PageElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surfaces.push(surface);
        self
    }

    pub fn select_all(&self, selector: &Selector) -> impl Iterator<Item = &PageElement> + '_ {
        let selector = *selector;
        self.elements
            .iter()
            .filter(move |element| selector.matches(element))
    }

    /// First element matched by the highest-priority selector that matches
    /// anything.
    pub fn first_match(&self, selectors: &[Selector]) -> Option<&PageElement> {
        selectors
            .iter()
            .find_map(|selector| self.select_all(selector).next())
    }

    /// Every element matched by the highest-priority selector that matches
    /// anything.
    pub fn first_matching_group(&self, selectors: &[Selector]) -> Vec<&PageElement> {
        selectors
            .iter()
            .map(|selector| self.select_all(selector).collect::<Vec<_>>())
            .find(|group| !group.is_empty())
            .unwrap_or_default()
    }
}

/// Structural matcher over tag, classes, and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Tag(&'static str),
    Class(&'static str),
    ClassContains(&'static str),
    Attr(&'static str),
    AttrEquals(&'static str, &'static str),
    AttrContains(&'static str, &'static str),
    All(&'static [Selector]),
}

impl Selector {
    pub fn matches(&self, element: &PageElement) -> bool {
        self.matches_parts(&element.tag, &element.classes, &element.attributes)
    }

    pub fn matches_surface(&self, surface: &Surface) -> bool {
        self.matches_parts("canvas", &surface.classes, &surface.attributes)
    }

    fn matches_parts(
        &self,
        tag: &str,
        classes: &[String],
        attributes: &BTreeMap<String, String>,
    ) -> bool {
        match self {
            Self::Tag(expected) => tag.eq_ignore_ascii_case(expected),
            Self::Class(expected) => classes.iter().any(|class| class == expected),
            Self::ClassContains(needle) => classes.iter().any(|class| class.contains(needle)),
            Self::Attr(name) => attributes.contains_key(*name),
            Self::AttrEquals(name, value) => {
                attributes.get(*name).map(String::as_str) == Some(*value)
            }
            Self::AttrContains(name, needle) => attributes
                .get(*name)
                .is_some_and(|value| value.contains(needle)),
            Self::All(parts) => parts
                .iter()
                .all(|part| part.matches_parts(tag, classes, attributes)),
        }
    }
}

mod rgba_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::debug;

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Undecodable pixels read as an unreadable surface rather than failing
    /// the whole snapshot.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(encoded) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) => {
                debug!(%error, "surface pixels are not valid base64");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGEND: [Selector; 2] = [
        Selector::AttrEquals("data-name", "legend-source-item"),
        Selector::ClassContains("legend"),
    ];

    #[test]
    fn first_matching_group_prefers_earlier_selector() {
        let page = PageSnapshot::default()
            .with_element(PageElement::new("div").with_class("legendMainSourceWrapper"))
            .with_element(
                PageElement::new("div").with_attr("data-name", "legend-source-item"),
            )
            .with_element(
                PageElement::new("div").with_attr("data-name", "legend-source-item"),
            );

        let group = page.first_matching_group(&LEGEND);
        assert_eq!(group.len(), 2);
        assert!(group
            .iter()
            .all(|element| element.attr("data-name") == Some("legend-source-item")));
    }

    #[test]
    fn missing_structure_yields_nothing() {
        let page = PageSnapshot::default();
        assert!(page.first_match(&LEGEND).is_none());
        assert!(page.first_matching_group(&LEGEND).is_empty());
    }

    #[test]
    fn conjunction_requires_every_part() {
        const ACTIVE: Selector = Selector::All(&[
            Selector::Attr("data-value"),
            Selector::ClassContains("isActive"),
        ]);
        let inactive = PageElement::new("button").with_attr("data-value", "60");
        let active = inactive.clone().with_class("button-isActive");

        assert!(!ACTIVE.matches(&inactive));
        assert!(ACTIVE.matches(&active));
    }

    #[test]
    fn tag_and_exact_class_and_attr_substring_match() {
        let button = PageElement::new("BUTTON")
            .with_class("chart-data-window")
            .with_attr("data-name", "legend-symbol-search-button");

        assert!(Selector::Tag("button").matches(&button));
        assert!(!Selector::Tag("div").matches(&button));
        assert!(Selector::Class("chart-data-window").matches(&button));
        assert!(!Selector::Class("data-window").matches(&button));
        assert!(Selector::AttrContains("data-name", "symbol-search").matches(&button));
        assert!(!Selector::AttrContains("id", "symbol-search").matches(&button));
        assert!(Selector::Tag("canvas").matches_surface(&Surface::unreadable(1, 1)));
    }

    #[test]
    fn decodes_snapshot_with_base64_pixels() {
        let json = r#"{
            "url": "https://example.test/chart/?symbol=AAPL",
            "title": "AAPL 182.5",
            "surfaces": [
                {"classes": ["chart"], "width": 1, "height": 1, "pixels": "AP8AgA=="},
                {"width": 2, "height": 2}
            ]
        }"#;

        let page = PageSnapshot::from_json(json).expect("must decode");
        let view = page.surfaces[0].pixel_view().expect("readable");
        assert_eq!(view.rgba(0, 0), [0, 255, 0, 128]);
        assert!(page.surfaces[1].pixel_view().is_none());
    }

    #[test]
    fn undecodable_pixels_leave_the_surface_unreadable() {
        let json = r#"{
            "elements": [{"tag": "div", "classes": ["legend"], "text": "O 1 H 2 L 1 C 2"}],
            "surfaces": [{"width": 1, "height": 1, "pixels": "not*base64"}]
        }"#;

        let page = PageSnapshot::from_json(json).expect("must decode");
        assert!(page.surfaces[0].pixel_view().is_none());
        assert_eq!(page.elements[0].text, "O 1 H 2 L 1 C 2");
    }

    #[test]
    fn select_all_outlives_a_temporary_selector() {
        let page = PageSnapshot::default()
            .with_element(PageElement::new("div").with_class("legend"))
            .with_element(PageElement::new("span"));

        let divs: Vec<_> = {
            let selector = Selector::Tag("div");
            page.select_all(&selector).collect()
        };
        assert_eq!(divs.len(), 1);
    }

    #[test]
    fn surface_rejects_mismatched_buffer() {
        let err = Surface::new(2, 2, vec![0; 15]).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::PixelBufferSize {
                expected: 16,
                actual: 15
            }
        ));
    }
}
