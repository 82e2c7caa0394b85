//! Byte spans of the editable parts of a test plan
//!
//! Edits are spliced into the source text instead of re-encoding the tree, so
//! every byte outside an edited `enabled` value (escapes, number spellings,
//! whitespace) survives exactly as written.

use std::ops::Range;

/// One `"key" : value` member of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  /// Decoded key
  pub key: String,
  /// Whitespace between the preceding `{` or `,` and the key
  pub leading: Range<usize>,
  /// The key, quotes included
  pub key_span: Range<usize>,
  pub value: Range<usize>,
}

impl Member {
  /// Text between the key and its value, colon included
  pub fn separator<'s>(&self, source: &'s str) -> &'s str {
    &source[self.key_span.end..self.value.start]
  }
}

/// An object and its members, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpan {
  /// Offset of the opening brace
  pub open: usize,
  pub members: Vec<Member>,
}

impl ObjectSpan {
  /// Last member named `key`; later duplicates win, as they do when decoding
  pub fn member(&self, key: &str) -> Option<&Member> {
    self.members.iter().rev().find(|m| m.key == key)
  }
}

/// Spans of every `testTargets` entry; `None` for entries that are not objects
pub fn test_target_entries(source: &str, key: &str) -> Result<Vec<Option<ObjectSpan>>, String> {
  let mut scanner = Scanner::new(source);
  scanner.skip_ws();
  let top = scanner.object()?;

  let Some(targets) = top.member(key) else {
    return Ok(Vec::new());
  };

  let mut scanner = Scanner::at(source, targets.value.start);
  let mut entries = Vec::new();
  for element in scanner.array()? {
    if source.as_bytes().get(element.start) == Some(&b'{') {
      entries.push(Some(Scanner::at(source, element.start).object()?));
    } else {
      entries.push(None);
    }
  }
  Ok(entries)
}

/// Separator used by the first member of the top-level object, if any
pub fn top_level_separator(source: &str) -> Option<String> {
  let mut scanner = Scanner::new(source);
  scanner.skip_ws();
  let top = scanner.object().ok()?;
  top.members.first().map(|m| m.separator(source).to_string())
}

/// Cursor over well-formed JSON text
struct Scanner<'a> {
  source: &'a str,
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Scanner<'a> {
  fn new(source: &'a str) -> Self {
    Self::at(source, 0)
  }

  fn at(source: &'a str, pos: usize) -> Self {
    Self {
      source,
      bytes: source.as_bytes(),
      pos,
    }
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
      self.pos += 1;
    }
  }

  fn expect(&mut self, byte: u8) -> Result<(), String> {
    match self.peek() {
      Some(b) if b == byte => {
        self.pos += 1;
        Ok(())
      }
      other => Err(format!(
        "expected `{}` at byte {}, found {:?}",
        byte as char,
        self.pos,
        other.map(char::from)
      )),
    }
  }

  /// Span of the value starting at the cursor
  fn value(&mut self) -> Result<Range<usize>, String> {
    let start = self.pos;
    match self.peek() {
      Some(b'{') => {
        self.object()?;
      }
      Some(b'[') => {
        self.array()?;
      }
      Some(b'"') => {
        self.string()?;
      }
      Some(_) => {
        while !matches!(self.peek(), None | Some(b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')) {
          self.pos += 1;
        }
        if self.pos == start {
          return Err(format!("expected a value at byte {}", start));
        }
      }
      None => return Err("unexpected end of document".to_string()),
    }
    Ok(start..self.pos)
  }

  fn string(&mut self) -> Result<Range<usize>, String> {
    let start = self.pos;
    self.expect(b'"')?;
    loop {
      match self.peek() {
        Some(b'\\') => self.pos += 2,
        Some(b'"') => {
          self.pos += 1;
          return Ok(start..self.pos);
        }
        Some(_) => self.pos += 1,
        None => return Err(format!("unterminated string at byte {}", start)),
      }
    }
  }

  fn object(&mut self) -> Result<ObjectSpan, String> {
    let open = self.pos;
    self.expect(b'{')?;
    let mut members = Vec::new();

    let mut leading_start = self.pos;
    self.skip_ws();
    if self.peek() == Some(b'}') {
      self.pos += 1;
      return Ok(ObjectSpan { open, members });
    }

    loop {
      let leading = leading_start..self.pos;
      let key_span = self.string()?;
      let key = serde_json::from_str::<String>(&self.source[key_span.clone()])
        .map_err(|e| format!("invalid key at byte {}: {}", key_span.start, e))?;
      self.skip_ws();
      self.expect(b':')?;
      self.skip_ws();
      let value = self.value()?;
      members.push(Member {
        key,
        leading,
        key_span,
        value,
      });

      self.skip_ws();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
          leading_start = self.pos;
          self.skip_ws();
        }
        Some(b'}') => {
          self.pos += 1;
          return Ok(ObjectSpan { open, members });
        }
        _ => return Err(format!("expected `,` or `}}` at byte {}", self.pos)),
      }
    }
  }

  fn array(&mut self) -> Result<Vec<Range<usize>>, String> {
    self.expect(b'[')?;
    let mut elements = Vec::new();
    self.skip_ws();
    if self.peek() == Some(b']') {
      self.pos += 1;
      return Ok(elements);
    }

    loop {
      elements.push(self.value()?);
      self.skip_ws();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
          self.skip_ws();
        }
        Some(b']') => {
          self.pos += 1;
          return Ok(elements);
        }
        _ => return Err(format!("expected `,` or `]` at byte {}", self.pos)),
      }
    }
  }
}
