use docnote_schemas::ConceptSource;

const SEQUENTIAL_RELATIONSHIPS: &[&str] = &[
    "\"{from}\" lays the groundwork for understanding \"{to}\"",
    "\"{from}\" and \"{to}\" complement each other",
    "\"{from}\" leads naturally into \"{to}\"",
];

const FRAMING_RELATIONSHIP: &str = "\"{from}\" and \"{to}\" frame the overall theme together";

/// Template renderer for card text that could not be found in the report
pub struct TemplateRenderer;

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn explanation(&self, concept: &str) -> String {
        format!(
            "{} is one of the central ideas identified in the analyzed documents. \
             Review the source material to understand its context and significance.",
            concept
        )
    }

    pub fn example(&self, concept: &str) -> String {
        format!(
            "In practice, {} shows up when the ideas from these documents are applied \
             to a concrete task or project.",
            concept
        )
    }

    /// Numbered suggestion list: three fixed lines plus one per concept source.
    pub fn application(&self, concept: &str, source: ConceptSource) -> String {
        let extra = match source {
            ConceptSource::SmartSummary => {
                format!("Revisit the original documents to verify the conclusions about {}.", concept)
            }
            ConceptSource::Keywords => {
                format!("Use \"{}\" as a search keyword to gather related material.", concept)
            }
            ConceptSource::FilteredAnalysis => {
                format!("Compare {} with the related passages in the source text.", concept)
            }
            ConceptSource::Fallback => {
                format!("Upload more detailed documents to refine {}.", concept)
            }
        };

        let lines = [
            format!("Review how {} relates to your current work or study goals.", concept),
            format!("Write a short note explaining {} in your own words.", concept),
            format!("Find one concrete situation where {} could be applied this week.", concept),
            extra,
        ];

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}. {}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Relationship text for the `index`-th sequential link.
    pub fn relationship(&self, index: usize, from: &str, to: &str) -> String {
        let template = SEQUENTIAL_RELATIONSHIPS[index % SEQUENTIAL_RELATIONSHIPS.len()];
        template.replace("{from}", from).replace("{to}", to)
    }

    pub fn framing_relationship(&self, first: &str, last: &str) -> String {
        FRAMING_RELATIONSHIP.replace("{from}", first).replace("{to}", last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_has_four_numbered_lines() {
        let renderer = TemplateRenderer::new();
        let text = renderer.application("caching", ConceptSource::Keywords);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("1. "));
        assert!(lines[3].starts_with("4. "));
        assert!(lines[3].contains("search keyword"));
    }

    #[test]
    fn test_application_extra_line_depends_on_source() {
        let renderer = TemplateRenderer::new();
        let a = renderer.application("x", ConceptSource::SmartSummary);
        let b = renderer.application("x", ConceptSource::Fallback);
        assert_ne!(a.lines().last(), b.lines().last());
        assert_eq!(a.lines().next(), b.lines().next());
    }

    #[test]
    fn test_relationship_templates_rotate() {
        let renderer = TemplateRenderer::new();
        assert_eq!(
            renderer.relationship(0, "A", "B"),
            "\"A\" lays the groundwork for understanding \"B\""
        );
        assert_eq!(renderer.relationship(3, "A", "B"), renderer.relationship(0, "A", "B"));
        assert!(renderer.framing_relationship("A", "D").contains("overall theme"));
    }
}
