//! Front-matter linked-PR extractor (§4.G).
//!
//! A PR description MAY begin with a conventional YAML front-matter block
//! (`---` ... `---`). When present and parseable, this module looks for a
//! `fensak.linked` key holding a sequence of `{prNum, repo?}` entries. The
//! actual forge lookup that turns each entry into a full [`LinkedPR`] (with
//! `isMerged`/`isClosed`) is adapter-specific (§4.D / §4.E talk to different
//! forges), so this module only does the parsing half; [`resolve`] drives
//! the lookup given any async closure that knows how to ask one forge about
//! one PR.

use crate::error::EngineError;
use crate::patch::LinkedPR;
use serde::Deserialize;
use std::future::Future;

/// One `fensak.linked` entry before it has been resolved against a forge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedPRRef {
    pub pr_num: u64,
    #[serde(default)]
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FensakBlock {
    linked: Option<Vec<LinkedPRRef>>,
}

#[derive(Debug, Deserialize)]
struct FrontMatterRoot {
    fensak: Option<FensakBlock>,
}

/// Split a leading `---`-delimited block off a PR description, if present.
fn split_front_matter(description: &str) -> Option<&str> {
    let mut lines = description.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let first_line_end = description.find('\n')? + 1;
    let mut cursor = first_line_end;
    for line in description[first_line_end..].lines() {
        if line.trim_end() == "---" {
            return Some(&description[first_line_end..cursor]);
        }
        cursor += line.len() + 1;
    }
    None
}

/// Parse the `fensak.linked` entries out of a PR description's front
/// matter. Returns an empty list when there is no front matter, or front
/// matter without a `fensak` key — that is not an error. Fails with
/// [`EngineError::MalformedFrontMatter`] when `fensak` is present but
/// `linked` is missing or structurally invalid.
pub fn extract_linked_pr_refs(description: &str) -> Result<Vec<LinkedPRRef>, EngineError> {
    let Some(block) = split_front_matter(description) else {
        return Ok(Vec::new());
    };

    let root: FrontMatterRoot = serde_yaml::from_str(block)
        .map_err(|e| EngineError::MalformedFrontMatter(format!("invalid front matter YAML: {e}")))?;

    let Some(fensak) = root.fensak else {
        return Ok(Vec::new());
    };

    match fensak.linked {
        Some(entries) => Ok(entries),
        None => Err(EngineError::MalformedFrontMatter(
            "fensak front matter present without a linked key".to_string(),
        )),
    }
}

/// Resolve parsed refs into full [`LinkedPR`]s by querying a forge for each
/// one's merge/close status. `lookup(repo, pr_num)` should return
/// `(is_merged, is_closed)` for that PR; `repo` is the ref's repo if given,
/// or the host repo's own `owner/name` otherwise.
pub async fn resolve<F, Fut>(
    refs: Vec<LinkedPRRef>,
    host_repo: &str,
    mut lookup: F,
) -> Result<Vec<LinkedPR>, EngineError>
where
    F: FnMut(String, u64) -> Fut,
    Fut: Future<Output = Result<(bool, bool), EngineError>>,
{
    let mut out = Vec::with_capacity(refs.len());
    for r in refs {
        let same_repo = r.repo.is_none();
        let repo_for_lookup = r.repo.clone().unwrap_or_else(|| host_repo.to_string());
        let (is_merged, is_closed) = lookup(repo_for_lookup, r.pr_num).await?;
        out.push(LinkedPR {
            repo: if same_repo { String::new() } else { r.repo.unwrap_or_default() },
            pr_num: r.pr_num,
            is_merged,
            is_closed,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_front_matter_is_empty() {
        let refs = extract_linked_pr_refs("just a normal PR description").unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn front_matter_without_fensak_key_is_empty() {
        let desc = "---\nother: true\n---\nbody text\n";
        let refs = extract_linked_pr_refs(desc).unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn fensak_without_linked_is_malformed() {
        let desc = "---\nfensak:\n  other: 1\n---\nbody\n";
        let err = extract_linked_pr_refs(desc).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrontMatter(_)));
    }

    #[test]
    fn fensak_linked_parses_entries() {
        // S7
        let desc = "---\nfensak:\n  linked:\n    - prNum: 41\n---\nSee #41\n";
        let refs = extract_linked_pr_refs(desc).unwrap();
        assert_eq!(refs, vec![LinkedPRRef { pr_num: 41, repo: None }]);
    }

    #[test]
    fn repo_field_is_preserved_when_present() {
        let desc = "---\nfensak:\n  linked:\n    - prNum: 7\n      repo: other/repo\n---\n";
        let refs = extract_linked_pr_refs(desc).unwrap();
        assert_eq!(
            refs,
            vec![LinkedPRRef {
                pr_num: 7,
                repo: Some("other/repo".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn resolve_fills_in_merged_and_closed() {
        let refs = vec![LinkedPRRef { pr_num: 41, repo: None }];
        let resolved = resolve(refs, "acme/widgets", |_repo, _num| async { Ok((true, true)) })
            .await
            .unwrap();
        assert_eq!(
            resolved,
            vec![LinkedPR {
                repo: String::new(),
                pr_num: 41,
                is_merged: true,
                is_closed: true,
            }]
        );
    }
}
