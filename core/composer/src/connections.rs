use docnote_schemas::{Card, Connection};

use crate::templates::TemplateRenderer;

const MAX_SEQUENTIAL_LINKS: usize = 3;

/// Links cards by position: neighbours first, then the first card to the last.
pub struct ConnectionBuilder {
    renderer: TemplateRenderer,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self {
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn build(&self, cards: &[Card]) -> Vec<Connection> {
        if cards.len() < 2 {
            return Vec::new();
        }

        let mut connections: Vec<Connection> = cards
            .windows(2)
            .take(MAX_SEQUENTIAL_LINKS)
            .enumerate()
            .map(|(i, pair)| Connection {
                from: pair[0].title.clone(),
                to: pair[1].title.clone(),
                relationship: self.renderer.relationship(i, &pair[0].title, &pair[1].title),
            })
            .collect();

        if let [first, .., last] = cards {
            if cards.len() >= 3 {
                connections.push(Connection {
                    from: first.title.clone(),
                    to: last.title.clone(),
                    relationship: self.renderer.framing_relationship(&first.title, &last.title),
                });
            }
        }

        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card {
                title: format!("Card {}", i),
                concept: "explanation".to_string(),
                example: "example".to_string(),
                application: "1. apply".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_connection_counts() {
        let builder = ConnectionBuilder::new();
        for n in 0..=6 {
            let expected = if n < 2 {
                0
            } else {
                (n - 1).min(3) + usize::from(n >= 3)
            };
            assert_eq!(builder.build(&cards(n)).len(), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_sequential_then_first_to_last() {
        let builder = ConnectionBuilder::new();
        let connections = builder.build(&cards(5));

        assert_eq!(connections.len(), 4);
        assert_eq!(connections[0].from, "Card 0");
        assert_eq!(connections[0].to, "Card 1");
        assert_eq!(connections[2].from, "Card 2");
        assert_eq!(connections[2].to, "Card 3");
        assert_eq!(connections[3].from, "Card 0");
        assert_eq!(connections[3].to, "Card 4");
        assert!(connections[3].relationship.contains("overall theme"));
    }

    #[test]
    fn test_two_cards_have_single_link() {
        let builder = ConnectionBuilder::new();
        let connections = builder.build(&cards(2));
        assert_eq!(connections.len(), 1);
        assert!(connections[0].relationship.contains("Card 0"));
        assert!(connections[0].relationship.contains("Card 1"));
    }
}
