use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::ffi::CStr;
use std::fs;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::ptr;

use super::{drive, error_block, interval_secs, Module, ModuleContext, Poller};
use crate::config::NetworkConfig;
use crate::i3bar::{Block, ClickEvent, MIDDLE_CLICK};
use crate::theme::Theme;

const DEFAULT_INTERVAL_SECS: u64 = 5;
const INSTANCE: &str = "network";
const IF_INET6_PATH: &str = "/proc/net/if_inet6";

// Kernel IFA_F_* address flags. SECONDARY and TEMPORARY share a bit.
pub const IFA_F_SECONDARY: u32 = 0x01;
pub const IFA_F_TEMPORARY: u32 = 0x01;
pub const IFA_F_DEPRECATED: u32 = 0x20;
pub const IFA_F_PERMANENT: u32 = 0x80;
pub const IFA_F_MANAGETEMPADDR: u32 = 0x100;
pub const IFA_F_NOPREFIXROUTE: u32 = 0x200;

/// One IPv6 address with its prefix length and kernel flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inet6Addr {
    pub addr: Ipv6Addr,
    pub prefix: u8,
    pub flags: u32,
}

/// A network interface and every address it currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub ipv4: Vec<(Ipv4Addr, u8)>,
    pub ipv6: Vec<Inet6Addr>,
}

/// Where interface and address information comes from.
pub trait AddressSource: Send {
    fn interfaces(&self) -> Result<Vec<Interface>>;
}

/// Live system state: `getifaddrs(3)` for links and IPv4, the procfs table
/// for IPv6 and its flags.
pub struct SystemAddresses {
    inet6_path: PathBuf,
}

impl Default for SystemAddresses {
    fn default() -> Self {
        Self {
            inet6_path: PathBuf::from(IF_INET6_PATH),
        }
    }
}

impl AddressSource for SystemAddresses {
    fn interfaces(&self) -> Result<Vec<Interface>> {
        let mut by_name = getifaddrs_ipv4().context("getifaddrs")?;
        match fs::read_to_string(&self.inet6_path) {
            Ok(table) => {
                for (name, addr) in parse_if_inet6(&table) {
                    let iface = by_name.entry(name.clone()).or_insert_with(|| Interface {
                        name,
                        ..Interface::default()
                    });
                    iface.ipv6.push(addr);
                }
            }
            // No IPv6 support in this kernel.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.inet6_path.display()))
            }
        }
        Ok(by_name.into_values().collect())
    }
}

fn getifaddrs_ipv4() -> io::Result<BTreeMap<String, Interface>> {
    let mut head: *mut libc::ifaddrs = ptr::null_mut();
    // SAFETY: getifaddrs fills `head` with a list we free below.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut by_name = BTreeMap::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: `cursor` is a node of the list returned by getifaddrs and
        // stays valid until freeifaddrs.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;
        if entry.ifa_name.is_null() {
            continue;
        }
        // SAFETY: ifa_name is a NUL-terminated string owned by the list.
        let name = unsafe { CStr::from_ptr(entry.ifa_name) }
            .to_string_lossy()
            .into_owned();
        let iface = by_name
            .entry(name.clone())
            .or_insert_with(|| Interface {
                name,
                ..Interface::default()
            });
        if entry.ifa_addr.is_null() {
            continue;
        }
        // SAFETY: ifa_addr is non-null and points to a sockaddr.
        let family = unsafe { (*entry.ifa_addr).sa_family } as libc::c_int;
        if family != libc::AF_INET {
            continue;
        }
        // SAFETY: AF_INET entries carry sockaddr_in for address and netmask.
        let addr = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
        let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
        let prefix = if entry.ifa_netmask.is_null() {
            32
        } else {
            // SAFETY: non-null netmask of an AF_INET entry.
            let mask = unsafe { &*(entry.ifa_netmask as *const libc::sockaddr_in) };
            u32::from_be(mask.sin_addr.s_addr).count_ones() as u8
        };
        iface.ipv4.push((ip, prefix));
    }

    // SAFETY: `head` came from a successful getifaddrs call.
    unsafe { libc::freeifaddrs(head) };
    Ok(by_name)
}

/// Parse `/proc/net/if_inet6`: address, ifindex, prefix length, scope and
/// flags (all hex), then the device name. Malformed lines are skipped.
pub fn parse_if_inet6(table: &str) -> Vec<(String, Inet6Addr)> {
    table
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [addr, _index, prefix, _scope, flags, name] = fields.as_slice() else {
                return None;
            };
            let addr = u128::from_str_radix(addr, 16).ok()?;
            let prefix = u8::from_str_radix(prefix, 16).ok()?;
            let flags = u32::from_str_radix(flags, 16).ok()?;
            Some((
                name.to_string(),
                Inet6Addr {
                    addr: Ipv6Addr::from(addr),
                    prefix,
                    flags,
                },
            ))
        })
        .collect()
}

fn ipv4_is_global_unicast(ip: Ipv4Addr) -> bool {
    !(ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        || ip.is_link_local())
}

fn ipv4_is_link_local_multicast(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    a == 224 && b == 0 && c == 0
}

fn ipv6_is_link_local_unicast(ip: Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn ipv6_is_unique_local(ip: Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}

fn ipv6_in_global_range(ip: Ipv6Addr) -> bool {
    ip.segments()[0] & 0xe000 == 0x2000
}

fn ipv6_is_global_unicast(ip: Ipv6Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        || ipv6_is_link_local_unicast(ip))
}

/// Preference for showing an IPv4 address; only positive scores are shown.
pub fn ipv4_score(ip: Ipv4Addr) -> i32 {
    let mut score = 0;
    if ipv4_is_global_unicast(ip) {
        score += 100;
    }
    if ip.is_private() {
        score += 90;
    }
    if ip.is_link_local() || ipv4_is_link_local_multicast(ip) {
        score -= 1000;
    }
    score
}

/// Preference for showing an IPv6 address given its kernel flags.
pub fn ipv6_score(ip: Ipv6Addr, flags: u32) -> i32 {
    let mut score = 0;
    if flags & IFA_F_DEPRECATED != 0 {
        score -= 1000;
    }
    if flags & IFA_F_TEMPORARY != 0 {
        score += 300;
    }
    if flags & IFA_F_PERMANENT != 0 {
        score += 500;
    }
    // Rarely the routed address even though it is often primary.
    if flags & IFA_F_MANAGETEMPADDR != 0 {
        score -= 2000;
    }
    // DHCPv6 or temporary.
    if flags & IFA_F_NOPREFIXROUTE != 0 {
        score += 500;
    }
    if ipv6_in_global_range(ip) {
        score += 500;
    }
    if ipv6_is_unique_local(ip) {
        score -= 10;
    }
    if flags & IFA_F_SECONDARY != 0 {
        score += 10;
    }
    if !ipv6_is_unique_local(ip) && ipv6_is_global_unicast(ip) {
        score += 100;
    }
    if ipv6_is_link_local_unicast(ip) {
        score -= 1000;
    }
    score
}

/// Highest-scoring candidate, the earliest one on ties, if its score is
/// positive.
fn best_by<T: Copy>(candidates: &[T], score: impl Fn(&T) -> i32) -> Option<T> {
    let mut best: Option<(i32, T)> = None;
    for candidate in candidates {
        let value = score(candidate);
        if best.map_or(true, |(top, _)| value > top) {
            best = Some((value, *candidate));
        }
    }
    best.filter(|(top, _)| *top > 0).map(|(_, candidate)| candidate)
}

pub fn best_ipv4(addrs: &[(Ipv4Addr, u8)]) -> Option<(Ipv4Addr, u8)> {
    best_by(addrs, |(ip, _)| ipv4_score(*ip))
}

pub fn best_ipv6(addrs: &[Inet6Addr]) -> Option<Inet6Addr> {
    best_by(addrs, |addr| ipv6_score(addr.addr, addr.flags))
}

enum Selector {
    Exact(String),
    Pattern(Regex),
    Invalid,
}

impl Selector {
    fn from_config(cfg: &NetworkConfig) -> Self {
        match (&cfg.interface, &cfg.pattern) {
            (Some(name), None) => Self::Exact(name.clone()),
            (None, Some(pattern)) => match Regex::new(pattern) {
                Ok(re) => Self::Pattern(re),
                Err(err) => {
                    tracing::warn!(%pattern, "network: bad interface pattern: {err}");
                    Self::Invalid
                }
            },
            _ => Self::Invalid,
        }
    }
}

struct LinkState {
    name: String,
    ipv4: Option<(Ipv4Addr, u8)>,
    ipv6: Option<Inet6Addr>,
}

/// Addresses of the configured interface(s). Middle click on an interface
/// shows or hides its addresses.
pub struct NetworkModule {
    selector: Selector,
    source: Box<dyn AddressSource>,
    interval: u64,
    shown: HashSet<String>,
    links: Result<Vec<LinkState>, String>,
}

impl NetworkModule {
    pub fn new(cfg: &NetworkConfig, source: Box<dyn AddressSource>) -> Self {
        Self {
            selector: Selector::from_config(cfg),
            source,
            interval: cfg.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
            shown: HashSet::new(),
            links: Ok(Vec::new()),
        }
    }

    pub fn from_config(cfg: &NetworkConfig) -> Self {
        Self::new(cfg, Box::new(SystemAddresses::default()))
    }

    fn collect(&self) -> Result<Vec<LinkState>, String> {
        let interfaces = self
            .source
            .interfaces()
            .map_err(|err| format!("{err:#}"))?;
        let matched: Vec<Interface> = match &self.selector {
            Selector::Invalid => return Err("invalid interface pattern string".to_string()),
            Selector::Exact(name) => {
                let found: Vec<_> = interfaces
                    .into_iter()
                    .filter(|iface| iface.name == *name)
                    .collect();
                if found.is_empty() {
                    return Err(format!("interface {name} not found"));
                }
                found
            }
            Selector::Pattern(re) => {
                let found: Vec<_> = interfaces
                    .into_iter()
                    .filter(|iface| re.is_match(&iface.name))
                    .collect();
                if found.is_empty() {
                    return Err("no matching interface".to_string());
                }
                found
            }
        };
        Ok(matched
            .into_iter()
            .map(|iface| LinkState {
                ipv4: best_ipv4(&iface.ipv4),
                ipv6: best_ipv6(&iface.ipv6),
                name: iface.name,
            })
            .collect())
    }

    fn link_text(&self, link: &LinkState) -> String {
        if !self.shown.contains(&link.name) {
            return link.name.clone();
        }
        let mut text = link.name.clone();
        if let Some((ip, prefix)) = link.ipv4 {
            text.push_str(&format!(" {ip}/{prefix}"));
        }
        if let Some(addr) = link.ipv6 {
            text.push_str(&format!(" {}/{}", addr.addr, addr.prefix));
        }
        text
    }
}

impl Poller for NetworkModule {
    fn refresh(&mut self) {
        self.links = self.collect();
        if let Err(err) = &self.links {
            tracing::debug!("network: {err}");
        }
    }

    fn render(&self, theme: &Theme) -> Vec<Block> {
        let links = match &self.links {
            Ok(links) => links,
            Err(err) => {
                let short = "network: error";
                return vec![error_block(theme, INSTANCE, format!("network: {err}"))
                    .with_short_text(short)
                    .with_min_width_of(short)];
            }
        };
        let hide_disconnected = matches!(self.selector, Selector::Pattern(_));
        let mut blocks = Vec::with_capacity(links.len());
        let mut disconnected = 0;
        for link in links {
            let color = match (link.ipv4.is_some(), link.ipv6.is_some()) {
                (_, true) => theme.normal(),
                (true, false) => theme.yellow(),
                (false, false) => {
                    disconnected += 1;
                    if hide_disconnected {
                        continue;
                    }
                    theme.red()
                }
            };
            let text = self.link_text(link);
            blocks.push(
                Block::new(link.name.as_str(), text.as_str())
                    .with_color(color)
                    .with_min_width_of(&text),
            );
        }
        if hide_disconnected && disconnected == links.len() {
            let text = "NET: none";
            blocks.push(
                Block::new(INSTANCE, text)
                    .with_color(theme.red())
                    .with_min_width_of(text),
            );
        }
        blocks
    }

    fn on_click(&mut self, click: &ClickEvent) -> bool {
        if !click.is_button(MIDDLE_CLICK) {
            return false;
        }
        let known = matches!(&self.links, Ok(links) if links.iter().any(|link| link.name == click.instance));
        if !known {
            return false;
        }
        if !self.shown.remove(&click.instance) {
            self.shown.insert(click.instance.clone());
        }
        true
    }
}

impl Module for NetworkModule {
    fn kind(&self) -> &'static str {
        "network"
    }

    fn run(self: Box<Self>, ctx: ModuleContext) {
        let interval = interval_secs(Some(self.interval), DEFAULT_INTERVAL_SECS);
        drive(*self, interval, ctx);
    }
}
