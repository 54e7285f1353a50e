use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use crate::cli::config::ExtractorSettings;
use crate::extract::{CallToAction, FormField, FragmentSet, TrustSignal};

/// Tag-level noise removed before any text extraction
const NOISE_SELECTORS: &[&str] =
    &["nav", "footer", "script", "style", "noscript", "[aria-hidden=\"true\"]"];

/// DOM reducer: strips noise subtrees and collects a bounded set of
/// semantically relevant fragments in document order.
///
/// Extraction never fails on missing optional elements; an absent title
/// or meta description simply yields an empty field.
pub struct Extractor {
    settings: ExtractorSettings,
    noise: Vec<Selector>,
    attr_bearing: Selector,
    title: Selector,
    meta_description: Selector,
    headings: Selector,
    snippets: Selector,
    anchors: Selector,
    images: Selector,
    blocks: Selector,
    forms: Selector,
    fields: Selector,
    /// Class/id vocabulary marking social-proof containers
    selector_vocab: Regex,
    /// Text keywords marking social-proof copy
    keyword_vocab: Regex,
    /// Class/id vocabulary marking cookie-consent containers
    consent_vocab: Regex,
}

impl Extractor {
    pub fn new(settings: ExtractorSettings) -> Result<Self> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| anyhow::anyhow!("Invalid selector '{}': {}", s, e))
        };

        let noise = NOISE_SELECTORS
            .iter()
            .map(|s| parse(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            settings,
            noise,
            attr_bearing: parse("[id], [class]")?,
            title: parse("title")?,
            meta_description: parse("meta[name=\"description\"]")?,
            headings: parse("h1, h2, h3")?,
            snippets: parse("p, li, span")?,
            anchors: parse("a[href]")?,
            images: parse("img[alt]")?,
            blocks: parse("section, blockquote, div, p")?,
            forms: parse("form")?,
            fields: parse("input, textarea, select")?,
            selector_vocab: Regex::new(
                r"(?i)(testimonial|review|badge|certified|partner-logo|client-logo|trustpilot|rating|case-stud|five-star)",
            )?,
            keyword_vocab: Regex::new(
                r"(?i)(what our (clients|customers) say|case stud(y|ies)|trusted by|customer stories|testimonial|loved by|as seen (on|in)|money.back guarantee|5[ -]star)",
            )?,
            consent_vocab: Regex::new(r"(?i)(cookie|consent|gdpr|cc-banner|cc-window)")?,
        })
    }

    /// Reduce a document to its fragment set
    pub fn extract(&self, html: &str) -> FragmentSet {
        let mut doc = Html::parse_document(html);
        self.remove_noise(&mut doc);

        let mut fragments = FragmentSet::default();

        if let Some(el) = doc.select(&self.title).next() {
            fragments.title = self.clip(&element_text(&el));
        }

        if let Some(el) = doc.select(&self.meta_description).next() {
            if let Some(content) = el.value().attr("content") {
                fragments.meta_description = self.clip(content.trim());
            }
        }

        for el in doc.select(&self.headings) {
            if fragments.headings.len() >= self.settings.max_headings {
                break;
            }
            let text = element_text(&el);
            if !text.is_empty() {
                fragments.headings.push(self.clip(&text));
            }
        }

        // Nested snippet matches (a span inside a p, an li wrapping a span)
        // repeat the same copy; keep the first occurrence only
        let mut seen_snippets: HashSet<String> = HashSet::new();
        for el in doc.select(&self.snippets) {
            if fragments.body_snippets.len() >= self.settings.max_snippets {
                break;
            }
            let text = element_text(&el);
            if text.len() >= self.settings.min_snippet_len && seen_snippets.insert(prefix_key(&text))
            {
                fragments.body_snippets.push(self.clip(&text));
            }
        }

        for el in doc.select(&self.anchors) {
            if fragments.calls_to_action.len() >= self.settings.max_ctas {
                break;
            }
            let href = el.value().attr("href").unwrap_or_default().trim();
            let text = element_text(&el);
            if !href.is_empty() && !text.is_empty() {
                fragments.calls_to_action.push(CallToAction {
                    text: self.clip(&text),
                    href: self.clip(href),
                });
            }
        }

        for el in doc.select(&self.images) {
            if fragments.image_alts.len() >= self.settings.max_image_alts {
                break;
            }
            let alt = el.value().attr("alt").unwrap_or_default().trim();
            if !alt.is_empty() {
                fragments.image_alts.push(self.clip(alt));
            }
        }

        self.collect_trust_signals(&doc, &mut fragments);
        self.collect_form_fields(&doc, &mut fragments);

        debug!(
            "Extracted {} headings, {} snippets, {} CTAs, {} trust signals, {} form fields",
            fragments.headings.len(),
            fragments.body_snippets.len(),
            fragments.calls_to_action.len(),
            fragments.trust_signals.len(),
            fragments.form_fields.len(),
        );

        fragments
    }

    /// Detach noise subtrees so their text cannot pollute any fragment.
    /// Runs before all collection passes.
    fn remove_noise(&self, doc: &mut Html) {
        let mut doomed = Vec::new();

        for selector in &self.noise {
            doomed.extend(doc.select(selector).map(|el| el.id()));
        }

        // Cookie-consent containers match by id/class vocabulary rather
        // than tag
        for el in doc.select(&self.attr_bearing) {
            if self.consent_vocab.is_match(&id_and_class(&el)) {
                doomed.push(el.id());
            }
        }

        for id in doomed {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// Two independent heuristics whose union is the trust-signal list:
    /// class/id vocabulary match, and keyword match on block elements of
    /// plausible testimonial length (50-1000 chars). Deduplicated by text
    /// prefix.
    fn collect_trust_signals(&self, doc: &Html, fragments: &mut FragmentSet) {
        let mut seen_prefixes: HashSet<String> = HashSet::new();

        for el in doc.select(&self.attr_bearing) {
            if fragments.trust_signals.len() >= self.settings.max_trust_signals {
                return;
            }
            let attrs = id_and_class(&el);
            if let Some(matched) = self.selector_vocab.find(&attrs) {
                let snippet = element_text(&el);
                if snippet.is_empty() || !seen_prefixes.insert(prefix_key(&snippet)) {
                    continue;
                }
                fragments.trust_signals.push(TrustSignal {
                    matched: matched.as_str().to_lowercase(),
                    snippet: self.clip(&snippet),
                });
            }
        }

        for el in doc.select(&self.blocks) {
            if fragments.trust_signals.len() >= self.settings.max_trust_signals {
                return;
            }
            let text = element_text(&el);
            if !(50..=1000).contains(&text.len()) {
                continue;
            }
            let lowered = text.to_lowercase();
            if let Some(matched) = self.keyword_vocab.find(&lowered) {
                if !seen_prefixes.insert(prefix_key(&text)) {
                    continue;
                }
                fragments.trust_signals.push(TrustSignal {
                    matched: matched.as_str().to_string(),
                    snippet: self.clip(&text),
                });
            }
        }
    }

    /// Inventory every form's input/textarea/select children. Field count
    /// quantifies form friction downstream.
    fn collect_form_fields(&self, doc: &Html, fragments: &mut FragmentSet) {
        for form in doc.select(&self.forms) {
            for field in form.select(&self.fields) {
                if fragments.form_fields.len() >= self.settings.max_form_fields {
                    return;
                }

                let tag = field.value().name();
                let field_type = match tag {
                    "textarea" => "textarea".to_string(),
                    "select" => "select".to_string(),
                    _ => field.value().attr("type").unwrap_or("text").to_string(),
                };
                let name = field
                    .value()
                    .attr("name")
                    .or_else(|| field.value().attr("id"))
                    .unwrap_or_default()
                    .to_string();
                let placeholder =
                    field.value().attr("placeholder").unwrap_or_default().to_string();

                fragments.form_fields.push(FormField { field_type, name, placeholder });
            }
        }
    }

    fn clip(&self, s: &str) -> String {
        if s.chars().count() <= self.settings.max_fragment_len {
            s.to_string()
        } else {
            s.chars().take(self.settings.max_fragment_len).collect()
        }
    }
}

/// Element text with whitespace collapsed
fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn id_and_class(el: &ElementRef) -> String {
    let id = el.value().attr("id").unwrap_or_default();
    let class = el.value().attr("class").unwrap_or_default();
    format!("{} {}", id, class)
}

/// Dedup key: the first few words of the normalized text
fn prefix_key(text: &str) -> String {
    text.to_lowercase().chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::AuditorConfig;

    fn extractor() -> Extractor {
        Extractor::new(AuditorConfig::default().extractor).unwrap()
    }

    const LANDING_PAGE: &str = r#"
        <html>
          <head>
            <title>Acme — Ship faster</title>
            <meta name="description" content="Acme helps teams ship faster.">
          </head>
          <body>
            <nav>Secret Nav Text <a href="/pricing">Pricing nav link</a></nav>
            <div id="cookie-banner">We use cookies to improve your experience</div>
            <h1>Ship your product faster</h1>
            <h2>Built for small teams</h2>
            <p>Acme gives your team the tooling it needs to move quickly without breaking things.</p>
            <a href="/signup">Start your free trial</a>
            <img src="/hero.png" alt="Dashboard screenshot">
            <section class="testimonials">
              <blockquote>Acme cut our release time in half. We could not imagine going back to the old workflow now.</blockquote>
            </section>
            <form>
              <input type="email" name="email" placeholder="Work email">
              <input type="text" name="company">
              <textarea name="message" placeholder="How can we help?"></textarea>
            </form>
            <footer>Footer boilerplate text that should never appear</footer>
            <script>var tracked = true;</script>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_core_fragments() {
        let fragments = extractor().extract(LANDING_PAGE);

        assert_eq!(fragments.title, "Acme — Ship faster");
        assert_eq!(fragments.meta_description, "Acme helps teams ship faster.");
        assert_eq!(
            fragments.headings,
            vec!["Ship your product faster", "Built for small teams"]
        );
        assert!(fragments
            .body_snippets
            .iter()
            .any(|s| s.contains("move quickly")));
        assert!(fragments
            .calls_to_action
            .iter()
            .any(|cta| cta.text == "Start your free trial" && cta.href == "/signup"));
        assert_eq!(fragments.image_alts, vec!["Dashboard screenshot"]);
    }

    #[test]
    fn test_noise_never_leaks_into_fragments() {
        let fragments = extractor().extract(LANDING_PAGE);
        let serialized = serde_json::to_string(&fragments).unwrap();

        assert!(!serialized.contains("Secret Nav Text"));
        assert!(!serialized.contains("Footer boilerplate"));
        assert!(!serialized.contains("tracked"));
        assert!(!serialized.contains("We use cookies"));
        assert!(!serialized.contains("Pricing nav link"));
    }

    #[test]
    fn test_hidden_elements_excluded() {
        let html = r#"<html><body>
            <div aria-hidden="true">Invisible helper text for a widget</div>
            <p>Visible paragraph with enough length to keep.</p>
        </body></html>"#;

        let fragments = extractor().extract(html);
        assert!(!fragments.body_snippets.iter().any(|s| s.contains("Invisible")));
        assert!(fragments.body_snippets.iter().any(|s| s.contains("Visible paragraph")));
    }

    #[test]
    fn test_sequences_are_bounded() {
        let mut html = String::from("<html><body>");
        for i in 0..1000 {
            html.push_str(&format!("<p>Synthetic paragraph number {} with padding text.</p>", i));
            html.push_str(&format!("<h2>Heading {}</h2>", i));
            html.push_str(&format!("<a href=\"/x{0}\">Link {0}</a>", i));
        }
        html.push_str("</body></html>");

        let settings = AuditorConfig::default().extractor;
        let fragments = extractor().extract(&html);

        assert!(fragments.body_snippets.len() <= settings.max_snippets);
        assert!(fragments.headings.len() <= settings.max_headings);
        assert!(fragments.calls_to_action.len() <= settings.max_ctas);
        // Earliest in document order wins
        assert!(fragments.headings[0].contains("Heading 0"));
    }

    #[test]
    fn test_min_length_filter_drops_icon_labels() {
        let html = "<html><body><span>OK</span><p>Long enough body copy to survive the filter.</p></body></html>";
        let fragments = extractor().extract(html);
        assert!(!fragments.body_snippets.iter().any(|s| s == "OK"));
    }

    #[test]
    fn test_trust_signal_selector_heuristic() {
        let fragments = extractor().extract(LANDING_PAGE);
        assert!(fragments.has_trust_signals());
        assert!(fragments
            .trust_signals
            .iter()
            .any(|t| t.matched.contains("testimonial")));
    }

    #[test]
    fn test_trust_signal_keyword_heuristic() {
        let html = r#"<html><body><section>
            What our clients say about working with us: the onboarding was painless and support
            answered within the hour every single time.
        </section></body></html>"#;

        let fragments = extractor().extract(html);
        assert!(fragments
            .trust_signals
            .iter()
            .any(|t| t.matched.contains("what our clients say")));
    }

    #[test]
    fn test_trust_signals_deduplicated_by_prefix() {
        let html = r#"<html><body>
            <div class="review">Acme cut our release time in half and the team loves the dashboard views.</div>
            <div class="review">Acme cut our release time in half and the team loves the dashboard views.</div>
        </body></html>"#;

        let fragments = extractor().extract(html);
        assert_eq!(fragments.trust_signals.len(), 1);
    }

    #[test]
    fn test_nested_snippet_elements_counted_once() {
        let html = r#"<html><body>
            <p><span>Ship features your customers actually asked for.</span></p>
            <ul><li><span>Works with the tools your team already uses.</span></li></ul>
            <p>A second paragraph that stands entirely on its own here.</p>
        </body></html>"#;

        let fragments = extractor().extract(html);
        assert_eq!(fragments.body_snippets.len(), 3);
        let unique: HashSet<&String> = fragments.body_snippets.iter().collect();
        assert_eq!(unique.len(), fragments.body_snippets.len());
    }

    #[test]
    fn test_form_inventory() {
        let fragments = extractor().extract(LANDING_PAGE);

        assert_eq!(fragments.form_fields.len(), 3);
        assert_eq!(fragments.form_fields[0].field_type, "email");
        assert_eq!(fragments.form_fields[0].placeholder, "Work email");
        assert_eq!(fragments.form_fields[2].field_type, "textarea");
    }

    #[test]
    fn test_missing_optionals_yield_empty_fields() {
        let fragments = extractor().extract("<html><body></body></html>");
        assert!(fragments.title.is_empty());
        assert!(fragments.meta_description.is_empty());
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_fragments_are_length_clipped() {
        let long = "x".repeat(5000);
        let html = format!("<html><body><p>{}</p></body></html>", long);
        let settings = AuditorConfig::default().extractor;

        let fragments = extractor().extract(&html);
        assert!(fragments.body_snippets[0].chars().count() <= settings.max_fragment_len);
    }
}
