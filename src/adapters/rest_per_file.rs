//! REST-per-file source adapter (§4.D), modeled on GitHub's pull-request
//! file-listing API.

use super::build_object_diff;
use crate::error::EngineError;
use crate::frontmatter;
use crate::patch::diff_parser;
use crate::patch::{ChangeSetMetadata, Patch, PatchOp, PullRequestPatches};
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

const PER_PAGE: u32 = 100;

pub struct RestPerFileAdapter {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct RefSide {
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    head: RefSide,
    base: RefSide,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    filename: String,
    previous_filename: Option<String>,
    status: String,
    additions: u64,
    deletions: u64,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(rename = "type")]
    kind: String,
    content: String,
}

impl RestPerFileAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    #[tracing::instrument(skip(self), fields(adapter = "rest_per_file", pr_number = number))]
    pub async fn fetch_patches(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestPatches, EngineError> {
        let pr = self.get_pull_request(owner, repo, number).await?;
        let files = self.list_changed_files(owner, repo, number).await?;

        let mut patch_list = Vec::new();
        for entry in files {
            self.expand_file_entry(owner, repo, &pr, entry, &mut patch_list).await?;
        }

        let linked_refs = frontmatter::extract_linked_pr_refs(pr.body.as_deref().unwrap_or(""))?;
        let host_repo = format!("{owner}/{repo}");
        let linked_prs = frontmatter::resolve(linked_refs, &host_repo, |repo, num| {
            let owner = owner.to_string();
            async move {
                let (o, r) = split_repo(&repo, &owner);
                self.pr_merge_status(&o, &r, num).await
            }
        })
        .await?;

        Ok(PullRequestPatches {
            metadata: ChangeSetMetadata {
                source_branch: pr.head.git_ref,
                target_branch: pr.base.git_ref,
                linked_prs,
            },
            patch_list,
        })
    }

    async fn expand_file_entry(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequestResponse,
        entry: FileEntry,
        out: &mut Vec<Patch>,
    ) -> Result<(), EngineError> {
        match entry.status.as_str() {
            "added" | "copied" => {
                let diff = parse_patch_text(entry.patch.as_deref())?;
                let head = self.get_contents(owner, repo, &entry.filename, &pr.head.git_ref).await?;
                let mut patch = Patch {
                    path: entry.filename,
                    op: PatchOp::Insert,
                    additions: entry.additions,
                    deletions: entry.deletions,
                    diff,
                    object_diff: None,
                };
                patch.object_diff = build_object_diff(&patch, None, head.as_deref())?;
                out.push(patch);
            }
            "removed" => {
                let diff = parse_patch_text(entry.patch.as_deref())?;
                let base = self.get_contents(owner, repo, &entry.filename, &pr.base.git_ref).await?;
                let mut patch = Patch {
                    path: entry.filename,
                    op: PatchOp::Delete,
                    additions: entry.additions,
                    deletions: entry.deletions,
                    diff,
                    object_diff: None,
                };
                patch.object_diff = build_object_diff(&patch, base.as_deref(), None)?;
                out.push(patch);
            }
            "changed" | "modified" => {
                let diff = parse_patch_text(entry.patch.as_deref())?;
                let base = self.get_contents(owner, repo, &entry.filename, &pr.base.git_ref).await?;
                let head = self.get_contents(owner, repo, &entry.filename, &pr.head.git_ref).await?;
                let mut patch = Patch {
                    path: entry.filename,
                    op: PatchOp::Modified,
                    additions: entry.additions,
                    deletions: entry.deletions,
                    diff,
                    object_diff: None,
                };
                patch.object_diff = build_object_diff(&patch, base.as_deref(), head.as_deref())?;
                out.push(patch);
            }
            "renamed" => {
                let Some(previous_filename) = entry.previous_filename.clone() else {
                    return Err(EngineError::InconsistentForgeResponse(format!(
                        "renamed file {} has no previous_filename",
                        entry.filename
                    )));
                };
                out.push(Patch {
                    path: previous_filename.clone(),
                    op: PatchOp::Delete,
                    additions: 0,
                    deletions: 0,
                    diff: Vec::new(),
                    object_diff: None,
                });
                out.push(Patch {
                    path: entry.filename.clone(),
                    op: PatchOp::Insert,
                    additions: 0,
                    deletions: 0,
                    diff: Vec::new(),
                    object_diff: None,
                });
                // Normalization (DESIGN.md): carry the rename's own content
                // diff on a synthetic third Modified record so callers never
                // special-case which adapter produced a rename.
                let diff = parse_patch_text(entry.patch.as_deref())?;
                let base = self.get_contents(owner, repo, &previous_filename, &pr.base.git_ref).await?;
                let head = self.get_contents(owner, repo, &entry.filename, &pr.head.git_ref).await?;
                let mut modified = Patch {
                    path: entry.filename,
                    op: PatchOp::Modified,
                    additions: entry.additions,
                    deletions: entry.deletions,
                    diff,
                    object_diff: None,
                };
                modified.object_diff = build_object_diff(&modified, base.as_deref(), head.as_deref())?;
                out.push(modified);
            }
            other => {
                return Err(EngineError::UnknownFileStatus {
                    path: entry.filename,
                    status: other.to_string(),
                })
            }
        }
        Ok(())
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequestResponse, EngineError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_url);
        Ok(self.http.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn list_changed_files(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<FileEntry>, EngineError> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!("{}/repos/{owner}/{repo}/pulls/{number}/files", self.base_url);
            let batch: Vec<FileEntry> = self
                .http
                .get(url)
                .query(&[("page", page), ("per_page", PER_PAGE)])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let got = batch.len() as u32;
            all.extend(batch);
            if got < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Returns `None` when the file does not exist at `at_ref` (404) —
    /// expected for the non-existent side of an insert/delete.
    async fn get_contents(&self, owner: &str, repo: &str, path: &str, at_ref: &str) -> Result<Option<String>, EngineError> {
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_url);
        let resp = self.http.get(url).query(&[("ref", at_ref)]).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: ContentsResponse = resp.error_for_status()?.json().await?;
        if body.kind != "file" {
            return Ok(None);
        }
        let cleaned: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| EngineError::InconsistentForgeResponse(format!("malformed base64 content for {path}: {e}")))?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn pr_merge_status(&self, owner: &str, repo: &str, number: u64) -> Result<(bool, bool), EngineError> {
        #[derive(Deserialize)]
        struct Status {
            merged: bool,
            state: String,
        }
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_url);
        let status: Status = self.http.get(url).send().await?.error_for_status()?.json().await?;
        Ok((status.merged, status.state == "closed" || status.merged))
    }
}

fn split_repo(repo: &str, default_owner: &str) -> (String, String) {
    match repo.split_once('/') {
        Some((o, r)) => (o.to_string(), r.to_string()),
        None => (default_owner.to_string(), repo.to_string()),
    }
}

fn parse_patch_text(patch: Option<&str>) -> Result<Vec<crate::patch::Hunk>, EngineError> {
    match patch {
        Some(text) => diff_parser::parse(text),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn added_file_becomes_insert_patch() {
        let mut server = mockito::Server::new_async().await;
        let _pr = server
            .mock("GET", "/repos/acme/widgets/pulls/41")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"head":{"ref":"feature"},"base":{"ref":"main"},"body":""}"#)
            .create_async()
            .await;
        let _files = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/pulls/41/files.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"filename":"a.txt","status":"added","additions":1,"deletions":0,"patch":"@@ -0,0 +1 @@\n+hello\n"}]"#,
            )
            .create_async()
            .await;
        let _contents = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/contents/a.txt.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"file","content":"aGVsbG8="}"#)
            .create_async()
            .await;

        let adapter = RestPerFileAdapter::new(server.url());
        let patches = adapter.fetch_patches("acme", "widgets", 41).await.unwrap();
        assert_eq!(patches.patch_list.len(), 1);
        assert_eq!(patches.patch_list[0].op, PatchOp::Insert);
        assert_eq!(patches.patch_list[0].path, "a.txt");
    }

    #[tokio::test]
    async fn renamed_file_without_previous_filename_is_inconsistent() {
        let mut server = mockito::Server::new_async().await;
        let _pr = server
            .mock("GET", "/repos/acme/widgets/pulls/41")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"head":{"ref":"feature"},"base":{"ref":"main"},"body":""}"#)
            .create_async()
            .await;
        let _files = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/pulls/41/files.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"filename":"b.txt","status":"renamed","additions":0,"deletions":0}]"#)
            .create_async()
            .await;

        let adapter = RestPerFileAdapter::new(server.url());
        let err = adapter.fetch_patches("acme", "widgets", 41).await.unwrap_err();
        assert!(matches!(err, EngineError::InconsistentForgeResponse(_)));
    }

    #[tokio::test]
    async fn renamed_file_with_content_change_becomes_three_records() {
        let mut server = mockito::Server::new_async().await;
        let _pr = server
            .mock("GET", "/repos/acme/widgets/pulls/41")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"head":{"ref":"feature"},"base":{"ref":"main"},"body":""}"#)
            .create_async()
            .await;
        let _files = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/pulls/41/files.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"filename":"new.txt","previous_filename":"old.txt","status":"renamed","additions":1,"deletions":1,"patch":"@@ -1 +1 @@\n-old\n+new\n"}]"#,
            )
            .create_async()
            .await;
        let _base_contents = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/contents/old.txt.*ref=main.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"file","content":"b2xk"}"#)
            .create_async()
            .await;
        let _head_contents = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/contents/new.txt.*ref=feature.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"file","content":"bmV3"}"#)
            .create_async()
            .await;

        let adapter = RestPerFileAdapter::new(server.url());
        let patches = adapter.fetch_patches("acme", "widgets", 41).await.unwrap();
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
    async fn unrecognized_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _pr = server
            .mock("GET", "/repos/acme/widgets/pulls/41")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"head":{"ref":"feature"},"base":{"ref":"main"},"body":""}"#)
            .create_async()
            .await;
        let _files = server
            .mock("GET", mockito::Matcher::Regex(r"^/repos/acme/widgets/pulls/41/files.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"filename":"c.txt","status":"unmergeable","additions":0,"deletions":0}]"#)
            .create_async()
            .await;

        let adapter = RestPerFileAdapter::new(server.url());
        let err = adapter.fetch_patches("acme", "widgets", 41).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownFileStatus { .. }));
    }
}
