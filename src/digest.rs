//! Template digests for the `lit-part` hydration markers.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Hashes the static strings of a template into the base64 digest carried by `<!--lit-part DIGEST-->`.
///
/// Two DJB2-style accumulators take turns over the UTF-16 code units of each string.
/// This identifies a template's static structure well enough to catch server/client disagreement. It isn't cryptographic.
#[must_use]
pub fn digest_for_template(strings: &[&str]) -> String {
	let mut hashes = [5381_u32; 2];
	for s in strings {
		for (i, unit) in s.encode_utf16().enumerate() {
			let hash = &mut hashes[i % 2];
			*hash = hash.wrapping_mul(33) ^ u32::from(unit);
		}
	}

	let mut bytes = [0_u8; 8];
	bytes[..4].copy_from_slice(&hashes[0].to_le_bytes());
	bytes[4..].copy_from_slice(&hashes[1].to_le_bytes());
	STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::digest_for_template;

	#[test]
	fn known_digests() {
		assert_eq!(digest_for_template(&["<p>", "</p>"]), "y6RVfKR7hws=");
		assert_eq!(digest_for_template(&["<div class=", ">", "</div>"]), "ojJ9hv6HqTI=");
	}

	#[test]
	fn hole_positions_matter() {
		assert_eq!(digest_for_template(&["<b>", "</b>"]), "2aRVfLY/hws=");
		assert_eq!(digest_for_template(&["<b></b>"]), "dqJVfJlBhws=");
	}
}
