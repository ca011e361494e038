use std::collections::HashSet;

use tracing::debug;

use crate::chunk::{Chunk, RetrievedChunk};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
    "it", "its", "as", "if", "when", "than", "because", "while", "what", "how", "why", "where",
    "which", "who", "user", "ask", "deep", "followup",
];

/// Domains a query can be attributed to, each with its trigger keywords.
/// Declaration order decides ties: the first matching domain wins.
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "cache",
        &["cache", "ttl", "invalidation", "stampede", "write-through", "write-back"],
    ),
    (
        "shard",
        &["shard", "sharding", "partition", "hot-partition", "resharding"],
    ),
    (
        "queue",
        &["queue", "message", "dlq", "backpressure", "idempotency", "delivery"],
    ),
    (
        "load-balancer",
        &["load", "balancer", "lb", "l4", "l7", "health-check"],
    ),
    (
        "database",
        &["database", "db", "replication", "primary", "replica"],
    ),
];

const BODY_TOKEN_SCORE: i64 = 2;
const KEYWORD_SCORE: i64 = 6;
const TAG_SCORE: i64 = 4;
const DOMAIN_BOOST: i64 = 8;

pub const DEFAULT_K: usize = 6;

/// Lowercase, strip punctuation (hyphens survive), drop short tokens and stopwords.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(String::from)
        .collect()
}

/// Per-chunk precomputed token sets, built once alongside the chunk list.
struct ChunkEntry {
    chunk: Chunk,
    body_tokens: HashSet<String>,
    keyword_set: HashSet<String>,
    tag_tokens: HashSet<String>,
    tags_lower: Vec<String>,
    /// Concatenated lowercase text + tags + keywords, for domain membership.
    haystack: String,
}

/// Immutable inverted-style index over the corpus, built once at startup and
/// shared read-only across sessions.
pub struct CorpusIndex {
    entries: Vec<ChunkEntry>,
}

impl CorpusIndex {
    /// Build the index from a chunk set. Chunk order is preserved and used to
    /// break scoring ties, which keeps retrieval deterministic.
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let entries = chunks
            .into_iter()
            .map(|chunk| {
                let body_tokens: HashSet<String> = tokenize(&chunk.text).into_iter().collect();
                let keyword_set: HashSet<String> =
                    chunk.keywords.iter().map(|k| k.to_lowercase()).collect();
                let tag_tokens: HashSet<String> = chunk
                    .tags
                    .iter()
                    .flat_map(|t| {
                        t.to_lowercase()
                            .replace('-', " ")
                            .split_whitespace()
                            .map(String::from)
                            .collect::<Vec<_>>()
                    })
                    .collect();
                let tags_lower: Vec<String> = chunk.tags.iter().map(|t| t.to_lowercase()).collect();
                let haystack = format!(
                    "{} {} {}",
                    chunk.text.to_lowercase(),
                    tags_lower.join(" "),
                    chunk
                        .keywords
                        .iter()
                        .map(|k| k.to_lowercase())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                ChunkEntry {
                    chunk,
                    body_tokens,
                    keyword_set,
                    tag_tokens,
                    tags_lower,
                    haystack,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Retrieve the top-k chunks for a free-text query, ranked by keyword
    /// overlap plus a query-level domain boost. Never fails: an empty corpus
    /// or an all-stopword query yields an empty result.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        // Unique query tokens, first occurrence order kept.
        let mut seen = HashSet::new();
        let q_tokens: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if q_tokens.is_empty() {
            return Vec::new();
        }

        let domain = query_domain(&q_tokens);
        debug!(tokens = q_tokens.len(), ?domain, "Scoring corpus query");

        let mut scored: Vec<(usize, i64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut score = 0;
                for t in &q_tokens {
                    if entry.body_tokens.contains(t) {
                        score += BODY_TOKEN_SCORE;
                    }
                    if entry.keyword_set.contains(t) {
                        score += KEYWORD_SCORE;
                    }
                    if entry.tag_tokens.contains(t)
                        || entry.tags_lower.iter().any(|tag| tag.contains(t.as_str()))
                    {
                        score += TAG_SCORE;
                    }
                }
                if let Some(domain_kws) = domain {
                    if domain_kws.iter().any(|kw| entry.haystack.contains(kw)) {
                        score += DOMAIN_BOOST;
                    }
                }
                (i, score)
            })
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable sort: equal scores keep original chunk order.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| {
                let c = &self.entries[i].chunk;
                RetrievedChunk {
                    id: c.id.clone(),
                    title: c.title.clone(),
                    tags: c.tags.clone(),
                    text: c.text.clone(),
                    score,
                }
            })
            .collect()
    }
}

/// Infer the query's domain from its tokens: exact set membership or
/// substring containment in either direction.
fn query_domain(q_tokens: &[String]) -> Option<&'static [&'static str]> {
    for (_, kws) in DOMAIN_KEYWORDS {
        let hit = kws.iter().any(|kw| {
            q_tokens
                .iter()
                .any(|t| t == kw || t.contains(kw) || kw.contains(t.as_str()))
        });
        if hit {
            return Some(kws);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, tags: &[&str], keywords: &[&str]) -> Chunk {
        Chunk {
            id: id.to_string(),
            doc_id: None,
            title: format!("title-{id}"),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The cache is a fast in-memory store, OK?");
        assert!(tokens.contains(&"cache".to_string()));
        assert!(tokens.contains(&"in-memory".to_string()));
        assert!(!tokens.iter().any(|t| t == "the" || t == "is" || t == "ok"));
    }

    #[test]
    fn test_keyword_match_outscores_body_match() {
        let index = CorpusIndex::build(vec![
            chunk("body", "stampede protection for busy systems", &[], &[]),
            chunk("kw", "protection for busy systems", &[], &["stampede"]),
        ]);
        let results = index.retrieve("stampede", 10);
        assert_eq!(results[0].id, "kw");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_domain_boost_lifts_related_chunks() {
        let index = CorpusIndex::build(vec![
            chunk("unrelated", "paxos consensus rounds", &[], &[]),
            chunk("related", "set the ttl carefully", &[], &[]),
        ]);
        // "cache" matches neither body, but the domain boost finds the ttl chunk.
        let results = index.retrieve("cache eviction", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "related");
        assert_eq!(results[0].score, 8);
    }

    #[test]
    fn test_empty_query_and_empty_corpus() {
        let empty = CorpusIndex::build(vec![]);
        assert!(empty.retrieve("cache", 5).is_empty());

        let index = CorpusIndex::build(vec![chunk("a", "cache text", &[], &[])]);
        assert!(index.retrieve("", 5).is_empty());
        assert!(index.retrieve("is a the", 5).is_empty());
    }

    #[test]
    fn test_ties_keep_chunk_order() {
        let index = CorpusIndex::build(vec![
            chunk("first", "queue backpressure", &[], &[]),
            chunk("second", "queue backpressure", &[], &[]),
        ]);
        let results = index.retrieve("backpressure queue", 10);
        assert_eq!(results[0].id, "first");
        assert_eq!(results[1].id, "second");
    }
}
