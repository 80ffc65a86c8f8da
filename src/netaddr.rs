use crate::setup::utils::pkg;
use std::{fs, net::Ipv4Addr, process::Command};
use tracing::{info, warn};

const PROBE_ADDRESS: &str = "223.5.5.5";

/// Best-effort primary outbound IPv4 address. Tries each method once, in
/// order, and returns the first hit; None means the operator must be asked.
pub fn detect() -> Option<Ipv4Addr> {
	ensure_ip_tool();
	let methods: &[(&str, &dyn Fn() -> Option<Ipv4Addr>)] = &[
		("route probe", &via_route_get),
		("hostname resolution", &via_hostname),
		("interface scan", &via_addr_show),
		("kernel route table", &via_proc_route),
	];
	first_hit(methods)
}

fn first_hit(methods: &[(&str, &dyn Fn() -> Option<Ipv4Addr>)]) -> Option<Ipv4Addr> {
	for (name, method) in methods {
		if let Some(addr) = method() {
			info!("Node address {addr} found via {name}.");
			return Some(addr);
		}
		info!("Address detection via {name} yielded nothing.");
	}
	None
}

// The `ip` tool backs two of the four methods; the rest still work without it.
fn ensure_ip_tool() {
	if which::which("ip").is_ok() {
		return;
	}
	warn!("The 'ip' tool is missing, attempting to install iproute.");
	if let Err(err) = pkg::install(&["iproute"]) {
		warn!("Could not install iproute: {err}");
	}
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
	let output = Command::new(program).args(args).output().ok()?;
	if !output.status.success() {
		return None;
	}
	Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn via_route_get() -> Option<Ipv4Addr> {
	let stdout = command_stdout("ip", &["-4", "route", "get", PROBE_ADDRESS])?;
	parse_route_src(&stdout)
}

fn via_hostname() -> Option<Ipv4Addr> {
	let stdout = command_stdout("hostname", &["-I"])?;
	first_global(&stdout)
}

fn via_addr_show() -> Option<Ipv4Addr> {
	let stdout = command_stdout("ip", &["-4", "-o", "addr", "show", "scope", "global"])?;
	parse_addr_show(&stdout)
}

fn via_proc_route() -> Option<Ipv4Addr> {
	let table = fs::read_to_string("/proc/net/route").ok()?;
	let iface = default_route_iface(&table)?;
	let stdout = command_stdout("ip", &["-4", "-o", "addr", "show", "dev", iface.as_str()])?;
	parse_addr_show(&stdout)
}

/// `ip route get` prints the source address after a literal `src` token.
fn parse_route_src(stdout: &str) -> Option<Ipv4Addr> {
	let mut tokens = stdout.split_whitespace();
	while let Some(token) = tokens.next() {
		if token == "src" {
			return tokens.next()?.parse().ok();
		}
	}
	None
}

/// First non-loopback address in a whitespace-separated list (`hostname -I`).
fn first_global(stdout: &str) -> Option<Ipv4Addr> {
	stdout
		.split_whitespace()
		.filter_map(|token| token.parse::<Ipv4Addr>().ok())
		.find(|addr| !addr.is_loopback())
}

/// `ip -4 -o addr show` lines carry `inet <addr>/<prefix>` pairs.
fn parse_addr_show(stdout: &str) -> Option<Ipv4Addr> {
	for line in stdout.lines() {
		let mut tokens = line.split_whitespace();
		while let Some(token) = tokens.next() {
			if token != "inet" {
				continue;
			}
			let addr = tokens.next()?.split('/').next()?.parse::<Ipv4Addr>().ok()?;
			if !addr.is_loopback() {
				return Some(addr);
			}
		}
	}
	None
}

/// Interface of the kernel default route (destination 00000000) in
/// /proc/net/route.
fn default_route_iface(table: &str) -> Option<String> {
	for line in table.lines().skip(1) {
		let fields = line.split_whitespace().collect::<Vec<&str>>();
		if fields.len() >= 2 && fields[1] == "00000000" {
			return Some(fields[0].to_owned());
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn first_hit_stops_at_the_first_method_that_answers() {
		let later_calls = Cell::new(0);
		let miss = || None;
		let hit = || Some(Ipv4Addr::new(10, 0, 0, 5));
		let counted = || {
			later_calls.set(later_calls.get() + 1);
			Some(Ipv4Addr::new(192, 168, 0, 9))
		};
		let methods: &[(&str, &dyn Fn() -> Option<Ipv4Addr>)] =
			&[("a", &miss), ("b", &hit), ("c", &counted)];
		assert_eq!(first_hit(methods), Some(Ipv4Addr::new(10, 0, 0, 5)));
		assert_eq!(later_calls.get(), 0);
	}

	#[test]
	fn first_hit_returns_none_when_every_method_misses() {
		let miss = || None;
		let methods: &[(&str, &dyn Fn() -> Option<Ipv4Addr>)] = &[("a", &miss), ("b", &miss)];
		assert_eq!(first_hit(methods), None);
	}

	#[test]
	fn route_src_token_is_extracted() {
		let stdout = "223.5.5.5 via 192.168.1.1 dev eth0 src 192.168.1.10 uid 0\n    cache\n";
		assert_eq!(parse_route_src(stdout), Some(Ipv4Addr::new(192, 168, 1, 10)));
		assert_eq!(parse_route_src("223.5.5.5 dev eth0\n"), None);
	}

	#[test]
	fn hostname_list_skips_loopback() {
		assert_eq!(
			first_global("127.0.0.1 10.0.0.7 fe80::1\n"),
			Some(Ipv4Addr::new(10, 0, 0, 7))
		);
		assert_eq!(first_global("127.0.0.1\n"), None);
	}

	#[test]
	fn addr_show_yields_first_global_inet() {
		let stdout = "1: lo    inet 127.0.0.1/8 scope host lo\n\
			2: eth0    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0\n";
		assert_eq!(parse_addr_show(stdout), Some(Ipv4Addr::new(192, 168, 1, 10)));
	}

	#[test]
	fn default_route_iface_matches_zero_destination() {
		let table = "Iface\tDestination\tGateway\tFlags\n\
			eth1\t0001A8C0\t00000000\t0001\n\
			eth0\t00000000\t0101A8C0\t0003\n";
		assert_eq!(default_route_iface(table), Some("eth0".to_owned()));
		assert_eq!(default_route_iface("Iface\tDestination\n"), None);
	}
}
