//! Combined-diff source adapter (§4.E), modeled on Bitbucket's one-blob
//! pull-request diff API.

use super::build_object_diff;
use crate::error::EngineError;
use crate::frontmatter;
use crate::patch::diff_parser;
use crate::patch::{ChangeSetMetadata, Patch, PatchOp, PullRequestPatches};
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;

pub struct CombinedDiffAdapter {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BranchSide {
    branch: BranchName,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct BranchName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    description: RenderedField,
}

#[derive(Debug, Deserialize)]
struct RenderedField {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct Links {
    diff: LinkHref,
}

#[derive(Debug, Deserialize)]
struct LinkHref {
    href: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    source: BranchSide,
    destination: BranchSide,
    rendered: Rendered,
    links: Links,
}

struct FileChunk<'a> {
    old_path: Option<&'a str>,
    new_path: Option<&'a str>,
    text: &'a str,
}

fn git_diff_header_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?m)^diff --git a/.*? b/.*?$").expect("static regex is valid"))
}

fn path_header_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?m)^(---|\+\+\+) (?:a/|b/)?(.+)$").expect("static regex is valid"))
}

/// Split a multi-file unified diff blob at each `diff --git` boundary,
/// harvesting the `--- `/`+++ ` paths of each chunk.
fn split_chunks(text: &str) -> Vec<FileChunk<'_>> {
    let header_re = git_diff_header_re();
    let starts: Vec<usize> = header_re.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let chunk_text = &text[start..end];
        let (mut old_path, mut new_path) = (None, None);
        for m in path_header_re().captures_iter(chunk_text) {
            let marker = &m[1];
            let path = m.get(2).map(|p| p.as_str().trim()).unwrap_or("");
            if marker == "---" {
                old_path = Some(if path == "/dev/null" { "/dev/null" } else { path });
            } else {
                new_path = Some(if path == "/dev/null" { "/dev/null" } else { path });
            }
        }
        chunks.push(FileChunk {
            old_path,
            new_path,
            text: chunk_text,
        });
    }
    chunks
}

impl CombinedDiffAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    #[tracing::instrument(skip(self), fields(adapter = "combined_diff", pr_number = number))]
    pub async fn fetch_patches(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestPatches, EngineError> {
        let pr = self.get_pull_request(owner, repo, number).await?;
        let diff_text = self.http.get(&pr.links.diff.href).send().await?.error_for_status()?.text().await?;

        let base_hash = &pr.destination.commit.hash;
        let head_hash = &pr.source.commit.hash;

        let mut patch_list = Vec::new();
        for chunk in split_chunks(&diff_text) {
            self.expand_chunk(owner, repo, base_hash, head_hash, chunk, &mut patch_list).await?;
        }

        let linked_refs = frontmatter::extract_linked_pr_refs(&pr.rendered.description.raw)?;
        let host_repo = format!("{owner}/{repo}");
        let linked_prs = frontmatter::resolve(linked_refs, &host_repo, |repo_ref, num| {
            let owner = owner.to_string();
            async move {
                let (o, r) = split_repo(&repo_ref, &owner);
                self.pr_status(&o, &r, num).await
            }
        })
        .await?;

        Ok(PullRequestPatches {
            metadata: ChangeSetMetadata {
                source_branch: pr.source.branch.name,
                target_branch: pr.destination.branch.name,
                linked_prs,
            },
            patch_list,
        })
    }

    async fn expand_chunk(
        &self,
        owner: &str,
        repo: &str,
        base_hash: &str,
        head_hash: &str,
        chunk: FileChunk<'_>,
        out: &mut Vec<Patch>,
    ) -> Result<(), EngineError> {
        let is_dev_null = |p: Option<&str>| matches!(p, Some("/dev/null") | None);
        let old_is_null = is_dev_null(chunk.old_path);
        let new_is_null = is_dev_null(chunk.new_path);

        if old_is_null && new_is_null {
            return Ok(()); // malformed/empty chunk, nothing to emit
        }

        if old_is_null {
            let path = chunk.new_path.unwrap().to_string();
            let diff = diff_parser::parse(chunk.text)?;
            let head = self.get_file_contents(owner, repo, head_hash, &path).await?;
            let mut patch = Patch {
                path,
                op: PatchOp::Insert,
                additions: 0,
                deletions: 0,
                diff,
                object_diff: None,
            };
            patch.object_diff = build_object_diff(&patch, None, head.as_deref())?;
            out.push(patch);
            return Ok(());
        }

        if new_is_null {
            let path = chunk.old_path.unwrap().to_string();
            let diff = diff_parser::parse(chunk.text)?;
            let base = self.get_file_contents(owner, repo, base_hash, &path).await?;
            let mut patch = Patch {
                path,
                op: PatchOp::Delete,
                additions: 0,
                deletions: 0,
                diff,
                object_diff: None,
            };
            patch.object_diff = build_object_diff(&patch, base.as_deref(), None)?;
            out.push(patch);
            return Ok(());
        }

        let old_path = chunk.old_path.unwrap().to_string();
        let new_path = chunk.new_path.unwrap().to_string();

        if old_path != new_path {
            out.push(Patch {
                path: old_path.clone(),
                op: PatchOp::Delete,
                additions: 0,
                deletions: 0,
                diff: Vec::new(),
                object_diff: None,
            });
            out.push(Patch {
                path: new_path.clone(),
                op: PatchOp::Insert,
                additions: 0,
                deletions: 0,
                diff: Vec::new(),
                object_diff: None,
            });
        }

        let diff = diff_parser::parse(chunk.text)?;
        let base = self.get_file_contents(owner, repo, base_hash, &old_path).await?;
        let head = self.get_file_contents(owner, repo, head_hash, &new_path).await?;
        let mut modified = Patch {
            path: new_path,
            op: PatchOp::Modified,
            additions: 0,
            deletions: 0,
            diff,
            object_diff: None,
        };
        modified.object_diff = build_object_diff(&modified, base.as_deref(), head.as_deref())?;
        out.push(modified);
        Ok(())
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestResponse, EngineError> {
        let url = format!("{}/2.0/repositories/{owner}/{repo}/pullrequests/{number}", self.base_url);
        Ok(self.http.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn get_file_contents(&self, owner: &str, repo: &str, hash: &str, path: &str) -> Result<Option<String>, EngineError> {
        let url = format!("{}/2.0/repositories/{owner}/{repo}/src/{hash}/{path}", self.base_url);
        let resp = self.http.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(resp.error_for_status()?.text().await?))
    }

    async fn pr_status(&self, owner: &str, repo: &str, number: u64) -> Result<(bool, bool), EngineError> {
        #[derive(Deserialize)]
        struct Status {
            state: String,
        }
        let url = format!("{}/2.0/repositories/{owner}/{repo}/pullrequests/{number}", self.base_url);
        let status: Status = self.http.get(url).send().await?.error_for_status()?.json().await?;
        let is_merged = status.state == "MERGED";
        let is_closed = status.state != "OPEN";
        Ok((is_merged, is_closed))
    }
}

fn split_repo(repo: &str, default_owner: &str) -> (String, String) {
    match repo.split_once('/') {
        Some((o, r)) => (o.to_string(), r.to_string()),
        None => (default_owner.to_string(), repo.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_file_diff_into_chunks() {
        let text = "diff --git a/x.txt b/x.txt\n--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-old\n+new\n\
diff --git a/y.txt b/y.txt\n--- /dev/null\n+++ b/y.txt\n@@ -0,0 +1 @@\n+hello\n";
        let chunks = split_chunks(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].old_path, Some("x.txt"));
        assert_eq!(chunks[0].new_path, Some("x.txt"));
        assert_eq!(chunks[1].old_path, Some("/dev/null"));
        assert_eq!(chunks[1].new_path, Some("y.txt"));
    }

    #[tokio::test]
    async fn renamed_file_with_content_change_becomes_three_records() {
        let mut server = mockito::Server::new_async().await;
        let diff_text =
            "diff --git a/old.txt b/new.txt\n--- a/old.txt\n+++ b/new.txt\n@@ -1 +1 @@\n-old\n+new\n";
        let pr_body = format!(
            r#"{{"source":{{"branch":{{"name":"feature"}},"commit":{{"hash":"head123"}}}},"destination":{{"branch":{{"name":"main"}},"commit":{{"hash":"base123"}}}},"rendered":{{"description":{{"raw":""}}}},"links":{{"diff":{{"href":"{}/diffraw"}}}}}}"#,
            server.url()
        );
        let _pr = server
            .mock("GET", "/2.0/repositories/acme/widgets/pullrequests/9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(pr_body)
            .create_async()
            .await;
        let _diff = server
            .mock("GET", "/diffraw")
            .with_status(200)
            .with_body(diff_text)
            .create_async()
            .await;
        let _base_src = server
            .mock("GET", "/2.0/repositories/acme/widgets/src/base123/old.txt")
            .with_status(200)
            .with_body("old")
            .create_async()
            .await;
        let _head_src = server
            .mock("GET", "/2.0/repositories/acme/widgets/src/head123/new.txt")
            .with_status(200)
            .with_body("new")
            .create_async()
            .await;

        let adapter = CombinedDiffAdapter::new(server.url());
        let patches = adapter.fetch_patches("acme", "widgets", 9).await.unwrap();
        assert_eq!(patches.patch_list.len(), 3);
        assert_eq!(patches.patch_list[0].op, PatchOp::Delete);
        assert_eq!(patches.patch_list[0].path, "old.txt");
        assert_eq!(patches.patch_list[1].op, PatchOp::Insert);
        assert_eq!(patches.patch_list[1].path, "new.txt");
        assert_eq!(patches.patch_list[2].op, PatchOp::Modified);
        assert_eq!(patches.patch_list[2].path, "new.txt");
        assert!(!patches.patch_list[2].diff.is_empty());
    }

    #[tokio::test]
    async fn insert_chunk_becomes_insert_patch() {
        let mut server = mockito::Server::new_async().await;
        let diff_text = "diff --git a/y.txt b/y.txt\n--- /dev/null\n+++ b/y.txt\n@@ -0,0 +1 @@\n+hello\n";
        let pr_body = format!(
            r#"{{"source":{{"branch":{{"name":"feature"}},"commit":{{"hash":"head123"}}}},"destination":{{"branch":{{"name":"main"}},"commit":{{"hash":"base123"}}}},"rendered":{{"description":{{"raw":""}}}},"links":{{"diff":{{"href":"{}/diffraw"}}}}}}"#,
            server.url()
        );
        let _pr = server
            .mock("GET", "/2.0/repositories/acme/widgets/pullrequests/9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(pr_body)
            .create_async()
            .await;
        let _diff = server
            .mock("GET", "/diffraw")
            .with_status(200)
            .with_body(diff_text)
            .create_async()
            .await;
        let _src = server
            .mock("GET", "/2.0/repositories/acme/widgets/src/head123/y.txt")
            .with_status(404)
            .create_async()
            .await;

        let adapter = CombinedDiffAdapter::new(server.url());
        let patches = adapter.fetch_patches("acme", "widgets", 9).await.unwrap();
        assert_eq!(patches.patch_list.len(), 1);
        assert_eq!(patches.patch_list[0].op, PatchOp::Insert);
        assert_eq!(patches.patch_list[0].path, "y.txt");
        assert_eq!(patches.patch_list[0].additions, 0);
    }
}
