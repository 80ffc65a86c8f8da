use sha2::{Digest, Sha256};
use std::{fs, path::Path};

/// True when the file exists and its content hashes to the expected digest.
/// A missing or unreadable file simply reads as "not configured".
pub fn file_matches(path: impl AsRef<Path>, expected: &[u8; 32]) -> bool {
	match fs::read(path) {
		Ok(bytes) => Sha256::digest(&bytes)[..] == expected[..],
		Err(_) => false,
	}
}

#[cfg(test)]
pub fn digest_of(content: &str) -> [u8; 32] {
	Sha256::digest(content.as_bytes()).into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn matching_and_mismatching_files_are_told_apart() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(b"overlay\nbr_netfilter\n").unwrap();
		let expected = digest_of("overlay\nbr_netfilter\n");
		assert!(file_matches(file.path(), &expected));
		let other = digest_of("something else\n");
		assert!(!file_matches(file.path(), &other));
		assert!(!file_matches("/definitely/not/a/file", &expected));
	}
}
