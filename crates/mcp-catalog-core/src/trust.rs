//! Trust classification: is a connector officially published?
//!
//! Classification is an ordered rule list evaluated first-match-wins:
//!
//! 1. [`TrustRule::Curated`]: the repository or id is on the curated
//!    allow-list. This is ground truth and always wins.
//! 2. [`TrustRule::OwnerNamedRepo`]: the repository is named after its
//!    owner (`acme/acme-mcp`), the usual shape of an organization's own
//!    official server.
//!
//! Anything else is unverified. The heuristic admits false positives and
//! negatives; the curated list is how they get corrected.

use std::collections::BTreeMap;

use crate::error::{CatalogError, Result};
use crate::identity::OwnerRepo;

/// Known official MCP servers: id → `owner/repo`.
const BUILTIN_OFFICIALS: &[(&str, &str)] = &[
    ("github", "github/github-mcp-server"),
    ("notion", "makenotion/notion-mcp-server"),
    ("elevenlabs", "elevenlabs/elevenlabs-mcp"),
    ("firecrawl", "firecrawl/firecrawl-mcp-server"),
    ("perplexity", "perplexityai/modelcontextprotocol"),
    ("microsoft", "MicrosoftDocs/mcp"),
    ("minimax", "MiniMax-AI/MiniMax-MCP"),
    ("qdrant", "qdrant/mcp-server-qdrant"),
    ("line", "line/line-bot-mcp-server"),
    ("alpaca", "alpacahq/alpaca-mcp-server"),
    ("jina", "jina-ai/MCP"),
    ("redis", "redis/mcp-redis"),
    ("kagi", "kagisearch/kagimcp"),
    ("razorpay", "razorpay/razorpay-mcp-server"),
    ("tripo", "VAST-AI-Research/tripo-mcp"),
    ("tableau", "tableau/tableau-mcp"),
    ("magicui", "magicuidesign/mcp"),
    ("neo4j", "neo4j/mcp"),
    ("posthog", "PostHog/mcp"),
    ("penpot", "penpot/penpot-mcp"),
    ("browserstack", "browserstack/mcp-server"),
    ("matlab", "matlab/matlab-mcp-core-server"),
    ("railway", "railwayapp/railway-mcp-server"),
    ("vectorize", "vectorize-io/vectorize-mcp-server"),
    ("taskade", "taskade/mcp"),
    ("octopus", "OctopusDeploy/mcp-server"),
    ("render", "render-oss/render-mcp-server"),
    ("ahrefs", "ahrefs/ahrefs-mcp-server"),
    ("alchemy", "alchemyplatform/alchemy-mcp-server"),
    ("datahub", "acryldata/mcp-server-datahub"),
    ("surrealdb", "surrealdb/surrealmcp"),
    ("quantconnect", "QuantConnect/mcp-server"),
    ("mailtrap", "mailtrap/mailtrap-mcp"),
    ("buildkite", "buildkite/buildkite-mcp-server"),
    ("aws-powertools", "aws-powertools/powertools-mcp"),
    ("minio", "minio/mcp-server-aistor"),
    ("netlify", "netlify/netlify-mcp"),
    ("infisical", "Infisical/infisical-mcp-server"),
    ("kintone", "kintone/mcp-server"),
    ("calcom", "calcom/cal-mcp"),
    ("wandb", "wandb/wandb-mcp-server"),
    ("harness", "harness/mcp-server"),
    ("growthbook", "growthbook/growthbook-mcp"),
    ("gravatar", "Automattic/mcp-server-gravatar"),
];

/// Curated allow-list of official connectors, with a case-insensitive
/// reverse index from repository to id.
#[derive(Debug, Clone, Default)]
pub struct CuratedList {
    entries: BTreeMap<String, OwnerRepo>,
    by_repo: BTreeMap<String, String>,
}

impl CuratedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The list of known official servers shipped with the crate.
    pub fn builtin() -> Self {
        let mut list = Self::new();
        for (id, repo) in BUILTIN_OFFICIALS {
            if let Some(or) = OwnerRepo::parse(repo) {
                list.insert(id, or);
            }
        }
        list
    }

    /// Build a list from `(id, "owner/repo")` pairs.
    ///
    /// Fails with `MalformedRecord` on a repository that is not `owner/repo`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut list = Self::new();
        for (id, repo) in pairs {
            let or = OwnerRepo::parse(repo.as_ref()).ok_or_else(|| {
                CatalogError::malformed(id.as_ref(), format!("'{}' is not owner/repo", repo.as_ref()))
            })?;
            list.insert(id.as_ref(), or);
        }
        Ok(list)
    }

    /// Add or replace an entry. A later entry for the same id wins.
    pub fn insert(&mut self, id: &str, repo: OwnerRepo) {
        if let Some(previous) = self.entries.insert(id.to_string(), repo.clone()) {
            self.by_repo.remove(&previous.key());
        }
        self.by_repo.insert(repo.key(), id.to_string());
    }

    pub fn extend(&mut self, other: &CuratedList) {
        for (id, repo) in other.iter() {
            self.insert(id, repo.clone());
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn repo_for(&self, id: &str) -> Option<&OwnerRepo> {
        self.entries.get(id)
    }

    /// Reverse lookup, case-insensitive on `owner/repo`.
    pub fn id_for_repo(&self, repo: &OwnerRepo) -> Option<&str> {
        self.by_repo.get(&repo.key()).map(String::as_str)
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OwnerRepo)> {
        self.entries.iter().map(|(id, repo)| (id.as_str(), repo))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The rule that classified a connector as verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustRule {
    Curated,
    OwnerNamedRepo,
}

impl TrustRule {
    /// Rules in evaluation order.
    pub const ORDER: [TrustRule; 2] = [TrustRule::Curated, TrustRule::OwnerNamedRepo];

    fn matches(self, repo: &OwnerRepo, canonical_id: &str, curated: &CuratedList) -> bool {
        match self {
            TrustRule::Curated => {
                curated.id_for_repo(repo).is_some() || curated.contains_id(&canonical_id.to_lowercase())
            }
            TrustRule::OwnerNamedRepo => {
                let owner = repo.owner.to_lowercase();
                let name = repo.repo.to_lowercase();
                !owner.is_empty() && (name.contains(&owner) || name.starts_with(&owner))
            }
        }
    }
}

/// First matching rule for a repository, if any.
pub fn classify(repo: &OwnerRepo, canonical_id: &str, curated: &CuratedList) -> Option<TrustRule> {
    TrustRule::ORDER
        .into_iter()
        .find(|rule| rule.matches(repo, canonical_id, curated))
}

pub fn is_verified(repo: &OwnerRepo, canonical_id: &str, curated: &CuratedList) -> bool {
    classify(repo, canonical_id, curated).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curated() -> CuratedList {
        CuratedList::from_pairs([
            ("perplexity", "perplexityai/modelcontextprotocol"),
            ("acme", "acme-corp/tools"),
        ])
        .unwrap()
    }

    #[test]
    fn test_curated_reverse_lookup_is_case_insensitive() {
        let list = curated();
        let repo = OwnerRepo::new("PerplexityAI", "ModelContextProtocol");
        assert_eq!(list.id_for_repo(&repo), Some("perplexity"));
        assert_eq!(classify(&repo, "whatever", &list), Some(TrustRule::Curated));
    }

    #[test]
    fn test_curated_id_lookup_wins() {
        let list = curated();
        let repo = OwnerRepo::new("someone", "fork-of-things");
        assert_eq!(classify(&repo, "acme", &list), Some(TrustRule::Curated));
    }

    #[test]
    fn test_curated_wins_over_heuristic() {
        let list = curated();
        // Would also match the owner-name rule; the curated rule is reported.
        let repo = OwnerRepo::new("acme-corp", "acme-corp-tools");
        assert_eq!(classify(&repo, "acme", &list), Some(TrustRule::Curated));
    }

    #[test]
    fn test_owner_named_repo_heuristic() {
        let list = CuratedList::new();
        assert_eq!(
            classify(&OwnerRepo::new("acme", "acme-connector"), "acme-connector", &list),
            Some(TrustRule::OwnerNamedRepo)
        );
        assert!(is_verified(&OwnerRepo::new("Redis", "mcp-redis"), "redis", &list));
        assert!(!is_verified(&OwnerRepo::new("alice", "weather-mcp"), "weather", &list));
    }

    #[test]
    fn test_empty_owner_never_matches_heuristic() {
        let list = CuratedList::new();
        assert!(!is_verified(&OwnerRepo::new("", "anything"), "anything", &list));
    }

    #[test]
    fn test_builtin_list_parses_every_entry() {
        let list = CuratedList::builtin();
        assert_eq!(list.len(), BUILTIN_OFFICIALS.len());
        assert_eq!(
            list.id_for_repo(&OwnerRepo::new("github", "github-mcp-server")),
            Some("github")
        );
    }

    #[test]
    fn test_insert_replaces_reverse_index() {
        let mut list = curated();
        list.insert("acme", OwnerRepo::new("acme-corp", "acme-mcp"));
        assert_eq!(list.id_for_repo(&OwnerRepo::new("acme-corp", "tools")), None);
        assert_eq!(
            list.id_for_repo(&OwnerRepo::new("acme-corp", "acme-mcp")),
            Some("acme")
        );
    }

    #[test]
    fn test_from_pairs_rejects_bad_repo() {
        assert!(CuratedList::from_pairs([("x", "not-a-repo")]).is_err());
    }
}
