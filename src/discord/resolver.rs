//! Outbound @mention resolution.
//!
//! Turns `@name` tokens in grid text into Discord member mentions when the
//! name identifies exactly one guild member.

use fancy_regex::Regex;
use tracing::debug;

use crate::discord::gateway::GuildGateway;

#[derive(Debug, Clone)]
pub struct MentionResolver {
    /// `@` followed by a run of non-whitespace; group 1 is the name.
    mention_pattern: Regex,
}

impl Default for MentionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MentionResolver {
    pub fn new() -> Self {
        Self {
            mention_pattern: Regex::new(r"@(\S+)").unwrap(),
        }
    }

    /// Distinct `(token, name)` pairs in order of first appearance.
    pub fn find_mentions(&self, message: &str) -> Vec<(String, String)> {
        let mut mentions: Vec<(String, String)> = Vec::new();
        for caps in self.mention_pattern.captures_iter(message).flatten() {
            let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if mentions.iter().any(|(seen, _)| seen == token.as_str()) {
                continue;
            }
            mentions.push((token.as_str().to_string(), name.as_str().to_string()));
        }
        mentions
    }

    /// Replace every resolvable `@name` token with `<@id>`.
    ///
    /// A token resolves only when the member search returns exactly one
    /// candidate; anything else, including lookup errors, leaves it verbatim.
    pub async fn process_mentions(&self, gateway: &dyn GuildGateway, message: &str) -> String {
        let mut result = message.to_string();

        for (token, name) in self.find_mentions(message) {
            debug!("Found mention: {} ({})", token, name);
            match gateway.search_members(&name, 2).await {
                Ok(candidates) if candidates.len() == 1 => {
                    let mention = format!("<@{}>", candidates[0]);
                    debug!("{} -> {}", token, mention);
                    result = result.replace(&token, &mention);
                }
                Ok(candidates) => {
                    debug!("Mention {} left as is: {} candidates", token, candidates.len());
                }
                Err(e) => {
                    debug!("Member search for {} failed: {}", name, e);
                }
            }
        }

        result
    }
}
