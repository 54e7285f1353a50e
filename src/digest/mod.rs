use crate::cli::config::DigestSettings;
use crate::completion::pagespeed::PageSpeedMetrics;
use crate::extract::FragmentSet;

/// Serialize a fragment set into the bounded text digest handed to the
/// completion backend.
///
/// Sections are emitted in a fixed order as labeled blocks, one bullet
/// per item; empty sections are omitted entirely. The character ceiling
/// is enforced by dropping whole sections from the end, so the digest
/// never ends inside a half-formed section. Identical inputs always
/// produce byte-identical output.
pub fn assemble(
    fragments: &FragmentSet,
    metrics: Option<&PageSpeedMetrics>,
    settings: &DigestSettings,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !fragments.title.is_empty() {
        sections.push(block("Title", std::iter::once(fragments.title.clone())));
    }
    if !fragments.meta_description.is_empty() {
        sections.push(block(
            "Meta Description",
            std::iter::once(fragments.meta_description.clone()),
        ));
    }
    if !fragments.headings.is_empty() {
        sections.push(block("Headings", fragments.headings.iter().cloned()));
    }
    if !fragments.body_snippets.is_empty() {
        sections.push(block("Body Snippets", fragments.body_snippets.iter().cloned()));
    }
    if !fragments.calls_to_action.is_empty() {
        sections.push(block(
            "Calls To Action",
            fragments
                .calls_to_action
                .iter()
                .map(|cta| format!("{} -> {}", cta.text, cta.href)),
        ));
    }
    if !fragments.image_alts.is_empty() {
        sections.push(block("Image Alt Text", fragments.image_alts.iter().cloned()));
    }
    if !fragments.trust_signals.is_empty() {
        sections.push(block(
            "Trust Signals",
            fragments
                .trust_signals
                .iter()
                .map(|signal| format!("[{}] {}", signal.matched, signal.snippet)),
        ));
    }
    if !fragments.form_fields.is_empty() {
        sections.push(block(
            "Form Fields",
            fragments.form_fields.iter().map(|field| {
                format!(
                    "type={} name={} placeholder=\"{}\"",
                    field.field_type, field.name, field.placeholder
                )
            }),
        ));
    }
    if let Some(metrics) = metrics {
        let mut lines = Vec::new();
        if let Some(score) = metrics.performance_score {
            lines.push(format!("Performance Score: {}/100", score));
        }
        if let Some(fcp) = &metrics.fcp {
            lines.push(format!("First Contentful Paint: {}", fcp));
        }
        if let Some(lcp) = &metrics.lcp {
            lines.push(format!("Largest Contentful Paint: {}", lcp));
        }
        if let Some(cls) = &metrics.cls {
            lines.push(format!("Cumulative Layout Shift: {}", cls));
        }
        if !lines.is_empty() {
            sections.push(block("Performance Metrics", lines.into_iter()));
        }
    }

    let mut digest = String::new();
    let mut used = 0usize;

    for section in sections {
        let separator = if digest.is_empty() { 0 } else { 1 };
        let cost = separator + section.chars().count();
        if used + cost > settings.max_chars {
            // Later sections are dropped wholesale, never sliced
            break;
        }
        if separator == 1 {
            digest.push('\n');
        }
        digest.push_str(&section);
        used += cost;
    }

    digest
}

fn block(label: &str, items: impl Iterator<Item = String>) -> String {
    let mut out = format!("{}:\n", label);
    for item in items {
        out.push_str("- ");
        out.push_str(&item);
        out.push('\n');
    }
    out
}
