use crate::error::InstallError;
use std::fs;

pub const HOSTS_PATH: &str = "/etc/hosts";

/// True when the hosts content already maps the address to exactly this name.
pub fn has_mapping(content: &str, ip: &str, hostname: &str) -> bool {
	content.lines().any(|line| {
		let mut fields = line.split_whitespace();
		fields.next() == Some(ip) && fields.any(|name| name == hostname)
	})
}

/// Rewrite the hosts content so the address maps to the hostname exactly
/// once: any existing line for that address is replaced, never duplicated.
pub fn upsert(content: &str, ip: &str, hostname: &str) -> String {
	let mapping = format!("{ip} {hostname}");
	let mut lines = Vec::new();
	let mut placed = false;
	for line in content.lines() {
		if line.split_whitespace().next() == Some(ip) {
			if !placed {
				lines.push(mapping.clone());
				placed = true;
			}
		} else {
			lines.push(line.to_owned());
		}
	}
	if !placed {
		lines.push(mapping);
	}
	lines.join("\n") + "\n"
}

pub fn apply(ip: &str, hostname: &str) -> Result<(), InstallError> {
	let content = fs::read_to_string(HOSTS_PATH)?;
	let updated = upsert(&content, ip, hostname);
	if updated != content {
		fs::write(HOSTS_PATH, updated)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn existing_line_for_the_address_is_replaced_not_duplicated() {
		let content = "127.0.0.1 localhost\n192.168.1.10 old-name extra\n";
		let updated = upsert(content, "192.168.1.10", "node-a");
		let matching = updated
			.lines()
			.filter(|line| line.starts_with("192.168.1.10"))
			.collect::<Vec<_>>();
		assert_eq!(matching, vec!["192.168.1.10 node-a"]);
		assert!(updated.contains("127.0.0.1 localhost"));
	}

	#[test]
	fn missing_mapping_is_appended() {
		let updated = upsert("127.0.0.1 localhost\n", "192.168.1.10", "node-a");
		assert!(updated.ends_with("192.168.1.10 node-a\n"));
	}

	#[test]
	fn duplicate_lines_for_the_address_collapse_to_one() {
		let content = "192.168.1.10 a\n192.168.1.10 b\n";
		let updated = upsert(content, "192.168.1.10", "node-a");
		assert_eq!(updated, "192.168.1.10 node-a\n");
	}

	#[test]
	fn mapping_probe_requires_both_address_and_name() {
		assert!(has_mapping("192.168.1.10 node-a\n", "192.168.1.10", "node-a"));
		assert!(!has_mapping("192.168.1.10 other\n", "192.168.1.10", "node-a"));
		assert!(!has_mapping("192.168.1.11 node-a\n", "192.168.1.10", "node-a"));
	}
}
