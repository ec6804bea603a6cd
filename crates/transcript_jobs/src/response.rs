use serde::de::DeserializeOwned;
use serde_json::{Deserializer, Value};

use crate::error::{JobError, Result};

/// Removes a surrounding markdown code fence, with or without a `json` tag.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
	let trimmed = raw.trim();
	let unfenced = trimmed.trim_start_matches('`');
	if unfenced.len() == trimmed.len() {
		return trimmed;
	}

	let unfenced = unfenced.strip_prefix("json").or_else(|| unfenced.strip_prefix("JSON")).unwrap_or(unfenced);
	unfenced.trim_end().trim_end_matches('`').trim()
}

/// Parses the first JSON object in `raw` that deserializes into `T`.
///
/// Model output often wraps the object in prose or code fences. The whole text is
/// tried first, then every `{` is treated as a possible start of the object.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
	let text = strip_code_fences(raw);

	let first_error = match serde_json::from_str::<T>(text) {
		Ok(value) => return Ok(value),
		Err(e) => e,
	};

	for (start, _) in text.match_indices('{') {
		let Some(Ok(candidate)) = Deserializer::from_str(&text[start..]).into_iter::<Value>().next() else {
			continue;
		};
		if let Ok(value) = serde_json::from_value::<T>(candidate) {
			return Ok(value);
		}
	}

	Err(JobError::Parse(format!("no usable JSON object in model output: {first_error}")))
}
