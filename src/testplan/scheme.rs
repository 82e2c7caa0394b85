//! Scheme lookup
//!
//! A scheme either references external test plans or embeds its testables
//! inline. Only the first form can be rewritten.

use super::resolve_container_reference;
use crate::core::error::{ResultExt, SelectError, SelectResult, TestPlanError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SCHEME_EXTENSION: &str = "xcscheme";

/// Folders that never hold shared schemes
const SKIPPED_DIRS: &[&str] = &[".git", ".build", "DerivedData", "node_modules"];

/// How a scheme declares what its test action runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestPlanMode {
  /// External test plan documents, absolute paths
  TestPlans(Vec<PathBuf>),
  /// Testables embedded in the scheme itself
  InlineTestables,
}

#[derive(Debug, Clone)]
pub struct Scheme {
  pub name: String,
  pub path: PathBuf,
  pub mode: TestPlanMode,
}

impl Scheme {
  /// Locate `<name>.xcscheme` under `root` and read its test action.
  pub fn find(root: &Path, name: &str) -> SelectResult<Self> {
    let file_name = format!("{}.{}", name, SCHEME_EXTENSION);
    let mut matches: Vec<PathBuf> = WalkDir::new(root)
      .follow_links(false)
      .into_iter()
      .filter_entry(|e| {
        let entry_name = e.file_name().to_str().unwrap_or("");
        !SKIPPED_DIRS.contains(&entry_name)
      })
      .filter_map(Result::ok)
      .filter(|e| e.file_type().is_file() && e.file_name().to_str() == Some(file_name.as_str()))
      .map(|e| e.into_path())
      .collect();
    matches.sort();

    let Some(path) = matches.into_iter().next() else {
      return Err(SelectError::TestPlan(TestPlanError::SchemeNotFound {
        name: name.to_string(),
        root: root.to_path_buf(),
      }));
    };

    let xml = std::fs::read_to_string(&path).with_context(|| format!("Failed to read scheme {}", path.display()))?;
    tracing::debug!(scheme = name, path = %path.display(), "Found scheme");
    Ok(Self::parse(name, path, &xml, root))
  }

  /// Read the test action of a scheme document.
  ///
  /// Only the `<TestAction>` element counts; comments and the other actions
  /// are ignored.
  pub fn parse(name: &str, path: PathBuf, xml: &str, root: &Path) -> Self {
    let action = test_action(&strip_comments(xml)).unwrap_or_default();
    let references = attribute_values(&action, "TestPlanReference", "reference");
    let mode = if !references.is_empty() {
      TestPlanMode::TestPlans(
        references
          .iter()
          .map(|r| resolve_container_reference(root, r))
          .collect(),
      )
    } else if !element_starts(&action, "TestableReference").is_empty() {
      TestPlanMode::InlineTestables
    } else {
      TestPlanMode::TestPlans(Vec::new())
    };

    Self {
      name: name.to_string(),
      path,
      mode,
    }
  }

  /// Test plans to rewrite; inline testables cannot be rewritten.
  pub fn test_plans(&self) -> SelectResult<&[PathBuf]> {
    match &self.mode {
      TestPlanMode::TestPlans(plans) => Ok(plans),
      TestPlanMode::InlineTestables => Err(SelectError::TestPlan(TestPlanError::UnsupportedDocumentMode {
        scheme: self.name.clone(),
      })),
    }
  }
}

fn strip_comments(xml: &str) -> String {
  let mut out = String::with_capacity(xml.len());
  let mut rest = xml;
  while let Some(start) = rest.find("<!--") {
    out.push_str(&rest[..start]);
    match rest[start + 4..].find("-->") {
      Some(end) => rest = &rest[start + 4 + end + 3..],
      // Unterminated comment runs to the end of the document
      None => return out,
    }
  }
  out.push_str(rest);
  out
}

/// Offsets just past `<element` for every opening tag of exactly `element`
fn element_starts(xml: &str, element: &str) -> Vec<usize> {
  let open = format!("<{}", element);
  xml
    .match_indices(open.as_str())
    .map(|(start, _)| start + open.len())
    .filter(|&end| matches!(xml.as_bytes().get(end), Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')))
    .collect()
}

/// The `<TestAction>` element, from its opening tag to its closing tag
fn test_action(xml: &str) -> Option<String> {
  let start = *element_starts(xml, "TestAction").first()?;
  let body = &xml[start..];
  let tag_end = body.find('>')?;
  if body[..tag_end].ends_with('/') {
    return Some(body[..tag_end].to_string());
  }
  let end = body.find("</TestAction>").unwrap_or(body.len());
  Some(body[..end].to_string())
}

/// Values of `attribute` on every `<element ...>` tag, entities decoded
fn attribute_values(xml: &str, element: &str, attribute: &str) -> Vec<String> {
  element_starts(xml, element)
    .into_iter()
    .filter_map(|start| {
      let tag = xml[start..].split('>').next().unwrap_or("");
      attribute_value(tag, attribute)
    })
    .collect()
}

/// `attribute = "value"` inside one tag, tolerating whitespace around `=`
fn attribute_value(tag: &str, attribute: &str) -> Option<String> {
  let mut rest = tag;
  while let Some(pos) = rest.find(attribute) {
    let preceded_by_space = rest[..pos].chars().next_back().is_none_or(char::is_whitespace);
    let after = rest[pos + attribute.len()..].trim_start();
    if preceded_by_space && let Some(after_eq) = after.strip_prefix('=') {
      let quoted = after_eq.trim_start().strip_prefix('"')?;
      let end = quoted.find('"')?;
      return Some(decode_entities(&quoted[..end]));
    }
    rest = &rest[pos + attribute.len()..];
  }
  None
}

fn decode_entities(value: &str) -> String {
  value
    .replace("&quot;", "\"")
    .replace("&apos;", "'")
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&amp;", "&")
}
