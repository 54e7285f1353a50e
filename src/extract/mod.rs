pub mod reducer;

use serde::Serialize;

/// An anchor worth showing the critique backend: visible text plus target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallToAction {
    pub text: String,
    pub href: String,
}

/// Evidence of a testimonial, badge, or other social-proof element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustSignal {
    /// The selector vocabulary word or text keyword that matched
    pub matched: String,
    pub snippet: String,
}

/// One input, textarea, or select inside a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub field_type: String,
    pub name: String,
    pub placeholder: String,
}

/// Structured output of the DOM reducer.
///
/// Every sequence preserves document order and is capped at extraction
/// time, so downstream size guarantees hold structurally. Missing page
/// elements yield empty fields, never errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FragmentSet {
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<String>,
    pub body_snippets: Vec<String>,
    pub calls_to_action: Vec<CallToAction>,
    pub image_alts: Vec<String>,
    pub trust_signals: Vec<TrustSignal>,
    pub form_fields: Vec<FormField>,
}

impl FragmentSet {
    /// True when nothing usable was extracted
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.meta_description.is_empty()
            && self.headings.is_empty()
            && self.body_snippets.is_empty()
            && self.calls_to_action.is_empty()
            && self.image_alts.is_empty()
            && self.trust_signals.is_empty()
            && self.form_fields.is_empty()
    }

    /// Whether any trust heuristic fired
    pub fn has_trust_signals(&self) -> bool {
        !self.trust_signals.is_empty()
    }
}
