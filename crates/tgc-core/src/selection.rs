use crate::{errors::Error, Result};

/// Validated indices into the ranked listing, in the order the user typed them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Parse a line like `"0 3 5"` against a listing of `len` groups.
///
/// Any bad token rejects the whole line; nothing is partially selected.
/// Repeated indices are kept once.
pub fn parse_selection(input: &str, len: usize) -> Result<Selection> {
    let mut indices = Vec::new();
    for token in input.split_whitespace() {
        let index = token
            .parse::<usize>()
            .map_err(|_| Error::Input(format!("{token:?} is not a group number")))?;
        if index >= len {
            return Err(Error::InvalidSelection { index, len });
        }
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    Ok(Selection { indices })
}

/// Only an explicit "yes" (any case) confirms.
pub fn is_confirmed(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}
