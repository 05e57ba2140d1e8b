//! Client side of the git smart HTTP protocol (v0).
//!
//! Covers the three message shapes a full clone and push need: the ref
//! advertisement from `info/refs`, the `git-upload-pack` exchange and the
//! `git-receive-pack` exchange with `report-status`.

use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::{GitError, Result};
use ferry_storage::{ObjectId, BRANCH_PREFIX, TAG_PREFIX};
use std::io::Cursor;
use tracing::debug;

/// Service used to fetch.
pub const UPLOAD_PACK: &str = "git-upload-pack";
/// Service used to push.
pub const RECEIVE_PACK: &str = "git-receive-pack";

/// Agent string sent with capabilities.
pub const AGENT: &str = concat!("ferry/", env!("CARGO_PKG_VERSION"));

/// A reference advertised by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedRef {
    /// Full reference name.
    pub name: String,
    /// Object the reference points at.
    pub id: ObjectId,
}

/// Parsed response of `GET info/refs?service=...`.
#[derive(Debug, Clone, Default)]
pub struct RefAdvertisement {
    refs: Vec<AdvertisedRef>,
    capabilities: Vec<String>,
}

impl RefAdvertisement {
    /// Parses an advertisement body for `service`.
    ///
    /// The `# service=` preamble is optional so that servers which skip it
    /// are still understood.
    pub fn parse(body: &[u8], service: &str) -> Result<Self> {
        let mut reader = PktLineReader::new(Cursor::new(body));
        let mut adv = Self::default();
        let mut first = true;

        while let Some(pkt) = reader.read()? {
            let line = match &pkt {
                PktLine::Flush => {
                    if first {
                        continue;
                    }
                    break;
                }
                PktLine::Data(_) => pkt
                    .as_str()
                    .ok_or_else(|| GitError::Protocol("non UTF-8 ref line".to_string()))?,
                other => {
                    return Err(GitError::Protocol(format!(
                        "unexpected {other:?} in ref advertisement"
                    )))
                }
            };

            if let Some(message) = line.strip_prefix("ERR ") {
                return Err(GitError::Remote(message.to_string()));
            }
            if let Some(advertised) = line.strip_prefix("# service=") {
                if advertised != service {
                    return Err(GitError::Protocol(format!(
                        "asked for {service}, remote answered for {advertised}"
                    )));
                }
                continue;
            }

            let line = if first {
                first = false;
                match line.split_once('\0') {
                    Some((refline, caps)) => {
                        adv.capabilities = caps.split_whitespace().map(str::to_string).collect();
                        refline
                    }
                    None => line,
                }
            } else {
                line
            };

            let (hex, name) = line
                .split_once(' ')
                .ok_or_else(|| GitError::Protocol(format!("malformed ref line {line:?}")))?;
            if name == "capabilities^{}" || name.ends_with("^{}") {
                continue;
            }
            let id = ObjectId::from_hex(hex)
                .map_err(|_| GitError::Protocol(format!("bad object id in {line:?}")))?;
            adv.refs.push(AdvertisedRef {
                name: name.to_string(),
                id,
            });
        }

        debug!(
            service,
            refs = adv.refs.len(),
            capabilities = adv.capabilities.len(),
            "Parsed ref advertisement"
        );
        Ok(adv)
    }

    /// Every advertised ref, peeled tags excluded.
    pub fn refs(&self) -> &[AdvertisedRef] {
        &self.refs
    }

    /// Capabilities from the first ref line.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// True if the remote announced `capability` (with or without a value).
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c == capability || c.split_once('=').is_some_and(|(k, _)| k == capability))
    }

    /// Branch HEAD points at, from the `symref=HEAD:` capability.
    pub fn head_target(&self) -> Option<&str> {
        self.capabilities
            .iter()
            .find_map(|c| c.strip_prefix("symref=HEAD:"))
    }

    /// Object a ref points at on the remote.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.refs.iter().find(|r| r.name == name).map(|r| r.id)
    }

    /// Branches and tags, the refs a migration carries over.
    pub fn transferable(&self) -> impl Iterator<Item = &AdvertisedRef> {
        self.refs
            .iter()
            .filter(|r| r.name.starts_with(BRANCH_PREFIX) || r.name.starts_with(TAG_PREFIX))
    }

    /// True when the remote has no refs at all.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Capabilities to request for a fetch given what the remote offers.
pub fn upload_capabilities(adv: &RefAdvertisement) -> Vec<String> {
    let mut caps = Vec::new();
    if adv.supports("side-band-64k") {
        caps.push("side-band-64k".to_string());
    } else if adv.supports("side-band") {
        caps.push("side-band".to_string());
    }
    if adv.supports("ofs-delta") {
        caps.push("ofs-delta".to_string());
    }
    if adv.supports("agent") {
        caps.push(format!("agent={AGENT}"));
    }
    caps
}

/// Builds the body of a `git-upload-pack` request that wants `wants` and
/// has nothing.
pub fn build_upload_request(wants: &[ObjectId], capabilities: &[String]) -> Result<Vec<u8>> {
    if wants.is_empty() {
        return Err(GitError::Protocol("fetch needs at least one want".to_string()));
    }
    let mut writer = PktLineWriter::new(Vec::new());
    for (i, id) in wants.iter().enumerate() {
        if i == 0 && !capabilities.is_empty() {
            writer.write_line(&format!("want {} {}", id, capabilities.join(" ")))?;
        } else {
            writer.write_line(&format!("want {id}"))?;
        }
    }
    writer.flush_pkt()?;
    writer.write_line("done")?;
    Ok(writer.into_inner())
}

/// Extracts the pack from a `git-upload-pack` response.
///
/// Negotiation lines (`NAK`, `ACK ...`) are skipped. With side-band the pack
/// is reassembled from channel 1, progress on channel 2 is logged and a
/// message on channel 3 aborts with [`GitError::Remote`].
pub fn read_upload_response(body: &[u8], side_band: bool) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(body);

    loop {
        let pos = cursor.position() as usize;
        if body[pos..].starts_with(b"PACK") {
            if side_band {
                return Err(GitError::Protocol(
                    "raw pack data where side-band was negotiated".to_string(),
                ));
            }
            return Ok(body[pos..].to_vec());
        }

        let mut reader = PktLineReader::new(&mut cursor);
        let pkt = match reader.read()? {
            Some(pkt) => pkt,
            None => return Err(GitError::Protocol("response ended before pack".to_string())),
        };
        let Some(data) = pkt.data() else {
            continue;
        };

        if side_band {
            if matches!(data.first(), Some(1..=3)) {
                return demux_side_band(pkt, &mut cursor);
            }
        }

        match pkt.as_str() {
            Some(line) if line == "NAK" || line.starts_with("ACK ") => continue,
            Some(line) if line.starts_with("ERR ") => {
                return Err(GitError::Remote(line[4..].to_string()))
            }
            _ => {
                return Err(GitError::Protocol(format!(
                    "unexpected line before pack: {:?}",
                    String::from_utf8_lossy(data)
                )))
            }
        }
    }
}

fn demux_side_band(first: PktLine, cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let mut pack = Vec::new();
    let mut reader = PktLineReader::new(cursor);
    let mut next = Some(first);

    while let Some(pkt) = next {
        if let Some((&band, payload)) = pkt.data().and_then(|d| d.split_first()) {
            match band {
                1 => pack.extend_from_slice(payload),
                2 => debug!(
                    progress = %String::from_utf8_lossy(payload).trim_end(),
                    "Remote progress"
                ),
                3 => {
                    return Err(GitError::Remote(
                        String::from_utf8_lossy(payload).trim_end().to_string(),
                    ))
                }
                other => {
                    return Err(GitError::Protocol(format!("unknown side-band channel {other}")))
                }
            }
        } else if pkt.is_flush() {
            break;
        }
        next = reader.read()?;
    }

    if pack.is_empty() {
        return Err(GitError::Protocol("side-band stream carried no pack".to_string()));
    }
    Ok(pack)
}

/// One reference update sent to `git-receive-pack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Full reference name.
    pub name: String,
    /// Value the remote currently has, zero to create.
    pub old: ObjectId,
    /// Value to set.
    pub new: ObjectId,
}

/// Builds the body of a `git-receive-pack` request.
pub fn build_receive_request(
    updates: &[RefUpdate],
    adv: &RefAdvertisement,
    pack: &[u8],
) -> Result<Vec<u8>> {
    if updates.is_empty() {
        return Err(GitError::Protocol("push needs at least one ref update".to_string()));
    }

    let mut caps = Vec::new();
    if adv.supports("report-status") {
        caps.push("report-status".to_string());
    }
    if adv.supports("agent") {
        caps.push(format!("agent={AGENT}"));
    }

    let mut writer = PktLineWriter::new(Vec::new());
    for (i, update) in updates.iter().enumerate() {
        let command = format!("{} {} {}", update.old, update.new, update.name);
        if i == 0 {
            writer.write_line(&format!("{command}\0{}", caps.join(" ")))?;
        } else {
            writer.write_line(&command)?;
        }
    }
    writer.flush_pkt()?;

    let mut body = writer.into_inner();
    body.extend_from_slice(pack);
    Ok(body)
}

/// Outcome of a single ref update as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefStatus {
    /// Full reference name.
    pub name: String,
    /// Rejection reason; `None` when the update was applied.
    pub error: Option<String>,
}

/// Parsed `report-status` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// `None` for `unpack ok`, otherwise the unpack failure.
    pub unpack_error: Option<String>,
    /// Per-reference results.
    pub refs: Vec<RefStatus>,
}

impl PushReport {
    /// Turns a report with any failure into [`GitError::PushRejected`].
    pub fn into_result(self) -> Result<Self> {
        if let Some(reason) = &self.unpack_error {
            return Err(GitError::PushRejected(format!("unpack failed: {reason}")));
        }
        let rejected: Vec<String> = self
            .refs
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| format!("{} ({e})", r.name)))
            .collect();
        if !rejected.is_empty() {
            return Err(GitError::PushRejected(rejected.join(", ")));
        }
        Ok(self)
    }
}

/// Parses a `report-status` response. An empty body, which is what a remote
/// without `report-status` sends, is an empty successful report.
pub fn parse_report_status(body: &[u8]) -> Result<PushReport> {
    let mut report = PushReport {
        unpack_error: None,
        refs: Vec::new(),
    };
    let mut reader = PktLineReader::new(Cursor::new(body));

    while let Some(pkt) = reader.read()? {
        if pkt.is_flush() {
            break;
        }
        let line = pkt
            .as_str()
            .ok_or_else(|| GitError::Protocol("non UTF-8 status line".to_string()))?;

        if let Some(status) = line.strip_prefix("unpack ") {
            if status != "ok" {
                report.unpack_error = Some(status.to_string());
            }
        } else if let Some(name) = line.strip_prefix("ok ") {
            report.refs.push(RefStatus {
                name: name.to_string(),
                error: None,
            });
        } else if let Some(rest) = line.strip_prefix("ng ") {
            let (name, reason) = rest.split_once(' ').unwrap_or((rest, "rejected"));
            report.refs.push(RefStatus {
                name: name.to_string(),
                error: Some(reason.to_string()),
            });
        } else if let Some(message) = line.strip_prefix("ERR ") {
            return Err(GitError::Remote(message.to_string()));
        } else {
            return Err(GitError::Protocol(format!("unexpected status line {line:?}")));
        }
    }

    Ok(report)
}
