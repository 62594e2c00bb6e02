//! Forge source adapters (§4.D / §4.E).
//!
//! Both adapters produce the same [`PullRequestPatches`] shape; the
//! normalization decision recorded in `DESIGN.md` makes renames look
//! identical across adapters regardless of how many records the origin
//! forge's API actually handed back.

pub mod combined_diff;
pub mod rest_per_file;

use crate::error::EngineError;
use crate::patch::object_diff::{self, ConfigFormat};
use crate::patch::{Patch, PatchOp};

/// Build the `objectDiff` for a patch whose path is a recognized
/// structured-config extension, given whichever side(s) of the content
/// the caller already fetched. `base`/`head` are `None` either because
/// that side doesn't exist (pure insert/delete) or because the caller
/// didn't need to fetch it for this patch's `op`.
fn build_object_diff(
    patch: &Patch,
    base: Option<&str>,
    head: Option<&str>,
) -> Result<Option<object_diff::ObjectDiff>, EngineError> {
    let Some(format) = ConfigFormat::from_path(&patch.path) else {
        return Ok(None);
    };

    Ok(match patch.op {
        PatchOp::Insert => head
            .map(|text| object_diff::parse(&patch.path, format, text))
            .transpose()?
            .map(object_diff::ObjectDiff::inserted),
        PatchOp::Delete => base
            .map(|text| object_diff::parse(&patch.path, format, text))
            .transpose()?
            .map(object_diff::ObjectDiff::deleted),
        PatchOp::Modified => match (base, head) {
            (Some(base), Some(head)) => Some(object_diff::ObjectDiff::modified(
                object_diff::parse(&patch.path, format, base)?,
                object_diff::parse(&patch.path, format, head)?,
            )),
            _ => None,
        },
        PatchOp::Unknown => None,
    })
}
