use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::domain::models::{DumpedKey, SlabGroup, StatEntry, StatsSnapshot};
use crate::error::{AppError, AppResult};

/// The capability set the dashboard needs from one cache-server
/// connection. Matches the memcached text protocol one to one; the trait
/// exists so services can run against an in-memory double in tests.
#[async_trait]
pub trait CacheClient: Send {
    /// `get` — `None` on miss.
    async fn get(&mut self, key: &str) -> AppResult<Option<String>>;

    /// `set` — `false` when the server refused the item (`NOT_STORED`).
    async fn set(&mut self, key: &str, value: &str, flags: u32, expire: i64) -> AppResult<bool>;

    /// `delete` — `false` when the key did not exist.
    async fn delete(&mut self, key: &str) -> AppResult<bool>;

    /// `flush_all` — clears the entire keyspace.
    async fn flush(&mut self) -> AppResult<bool>;

    /// `stats` — the general statistics table, in server order.
    async fn stats(&mut self) -> AppResult<StatsSnapshot>;

    /// `stats slabs` — per-slab-class metadata grouped by the raw group
    /// token, including any non-numeric totals rows the server emits.
    async fn slab_classes(&mut self) -> AppResult<Vec<SlabGroup>>;

    /// `stats cachedump <id> <limit>` — a bounded sample of the keys
    /// currently assigned to one slab class.
    async fn dump_keys(&mut self, slab_id: u32, limit: u32) -> AppResult<Vec<DumpedKey>>;
}

/// A memcached text-protocol client over a single TCP connection. One
/// instance serves one dashboard request; connections are not pooled or
/// reused across requests.
pub struct MemcacheClient {
    addr: String,
    timeout: Duration,
    stream: BufReader<TcpStream>,
    /// A failed command may leave part of a reply unread on the stream,
    /// where it would be parsed as the next command's reply. The next
    /// command reopens the connection instead.
    desynced: bool,
}

impl MemcacheClient {
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> AppResult<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = Self::open_stream(&addr, timeout).await?;

        Ok(Self {
            addr,
            timeout,
            stream: BufReader::new(stream),
            desynced: false,
        })
    }

    async fn open_stream(addr: &str, timeout: Duration) -> AppResult<TcpStream> {
        tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| AppError::CacheUnavailable(format!("Connection to {} timed out", addr)))?
            .map_err(|e| {
                AppError::CacheUnavailable(format!("Failed to connect to {}: {}", addr, e))
            })
    }

    async fn ensure_synced(&mut self) -> AppResult<()> {
        if self.desynced {
            tracing::debug!(addr = %self.addr, "Reopening connection after failed command");
            let stream = Self::open_stream(&self.addr, self.timeout).await?;
            self.stream = BufReader::new(stream);
            self.desynced = false;
        }
        Ok(())
    }

    fn poison_on_err<T>(&mut self, result: AppResult<T>) -> AppResult<T> {
        if result.is_err() {
            self.desynced = true;
        }
        result
    }

    async fn send_line(&mut self, line: &str) -> AppResult<()> {
        let stream = self.stream.get_mut();
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to send command: {}", e)))?;
        stream
            .write_all(b"\r\n")
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to send command: {}", e)))?;
        Ok(())
    }

    /// Reads one CRLF-terminated response line. Protocol-level error
    /// replies surface as `CacheProtocol` errors here so every command
    /// path handles them uniformly.
    async fn read_line(&mut self) -> AppResult<String> {
        let mut line = String::new();
        let read = self
            .stream
            .read_line(&mut line)
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to read response: {}", e)))?;

        if read == 0 {
            return Err(AppError::CacheProtocol(
                "Connection closed by server".to_string(),
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();

        if line == "ERROR"
            || line.starts_with("CLIENT_ERROR")
            || line.starts_with("SERVER_ERROR")
        {
            return Err(AppError::CacheProtocol(format!("Server replied: {}", line)));
        }

        Ok(line)
    }

    /// Reads a data block of `len` bytes plus the trailing CRLF.
    async fn read_data(&mut self, len: usize) -> AppResult<String> {
        let mut buf = vec![0u8; len + 2];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to read data block: {}", e)))?;
        Ok(String::from_utf8_lossy(&buf[..len]).to_string())
    }

    /// Reads `STAT name value` lines until `END`, preserving server order.
    async fn read_stat_lines(&mut self) -> AppResult<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == "END" {
                break;
            }
            let Some(rest) = line.strip_prefix("STAT ") else {
                return Err(AppError::CacheProtocol(format!(
                    "Unexpected stats line: {}",
                    line
                )));
            };
            let (name, value) = rest.split_once(' ').unwrap_or((rest, ""));
            pairs.push((name.to_string(), value.to_string()));
        }
        Ok(pairs)
    }
}

/// Groups `stats slabs` output by the token before the first `:` in each
/// stat name. Bare names (the totals rows) become their own groups, which
/// the scan later skips as non-numeric.
fn group_slab_stats(pairs: Vec<(String, String)>) -> Vec<SlabGroup> {
    let mut groups: Vec<SlabGroup> = Vec::new();

    for (name, value) in pairs {
        let (id, field) = match name.split_once(':') {
            Some((id, field)) => (id.to_string(), field.to_string()),
            None => (name.clone(), name),
        };

        match groups.iter_mut().find(|g| g.id == id) {
            Some(group) => group.fields.push((field, value)),
            None => groups.push(SlabGroup {
                id,
                fields: vec![(field, value)],
            }),
        }
    }

    groups
}

/// Parses one cachedump reply line: `ITEM <key> [<size> b; <expiry> s]`.
fn parse_dump_line(line: &str) -> AppResult<DumpedKey> {
    let malformed = || AppError::CacheProtocol(format!("Malformed cachedump line: {}", line));

    let rest = line.strip_prefix("ITEM ").ok_or_else(malformed)?;
    let (key, meta) = rest.split_once(' ').ok_or_else(malformed)?;
    let meta = meta
        .trim()
        .strip_prefix('[')
        .and_then(|m| m.strip_suffix(']'))
        .ok_or_else(malformed)?;
    let (size_part, expiry_part) = meta.split_once(';').ok_or_else(malformed)?;

    let size_bytes = size_part
        .trim()
        .strip_suffix(" b")
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    let expires_at = expiry_part
        .trim()
        .strip_suffix(" s")
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;

    Ok(DumpedKey {
        key: key.to_string(),
        size_bytes,
        expires_at,
    })
}

impl MemcacheClient {
    async fn get_inner(&mut self, key: &str) -> AppResult<Option<String>> {
        self.send_line(&format!("get {}", key)).await?;

        let mut value = None;
        loop {
            let line = self.read_line().await?;
            if line == "END" {
                break;
            }
            let Some(rest) = line.strip_prefix("VALUE ") else {
                return Err(AppError::CacheProtocol(format!(
                    "Unexpected reply to get: {}",
                    line
                )));
            };
            let bytes: usize = rest
                .split_whitespace()
                .nth(2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    AppError::CacheProtocol(format!("Malformed VALUE line: {}", line))
                })?;
            value = Some(self.read_data(bytes).await?);
        }

        Ok(value)
    }

    async fn set_inner(&mut self, key: &str, value: &str, flags: u32, expire: i64) -> AppResult<bool> {
        let payload = value.as_bytes();
        self.send_line(&format!("set {} {} {} {}", key, flags, expire, payload.len()))
            .await?;

        let stream = self.stream.get_mut();
        stream
            .write_all(payload)
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to send data block: {}", e)))?;
        stream
            .write_all(b"\r\n")
            .await
            .map_err(|e| AppError::CacheProtocol(format!("Failed to send data block: {}", e)))?;

        let line = self.read_line().await?;
        Ok(line == "STORED")
    }

    async fn delete_inner(&mut self, key: &str) -> AppResult<bool> {
        self.send_line(&format!("delete {}", key)).await?;
        let line = self.read_line().await?;
        Ok(line == "DELETED")
    }

    async fn flush_inner(&mut self) -> AppResult<bool> {
        self.send_line("flush_all").await?;
        let line = self.read_line().await?;
        Ok(line == "OK")
    }

    async fn stats_inner(&mut self) -> AppResult<StatsSnapshot> {
        self.send_line("stats").await?;
        let entries = self
            .read_stat_lines()
            .await?
            .into_iter()
            .map(|(name, value)| StatEntry { name, value })
            .collect();
        Ok(StatsSnapshot { entries })
    }

    async fn slab_classes_inner(&mut self) -> AppResult<Vec<SlabGroup>> {
        self.send_line("stats slabs").await?;
        let pairs = self.read_stat_lines().await?;
        Ok(group_slab_stats(pairs))
    }

    async fn dump_keys_inner(&mut self, slab_id: u32, limit: u32) -> AppResult<Vec<DumpedKey>> {
        self.send_line(&format!("stats cachedump {} {}", slab_id, limit))
            .await?;

        let mut keys = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == "END" {
                break;
            }
            keys.push(parse_dump_line(&line)?);
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheClient for MemcacheClient {
    async fn get(&mut self, key: &str) -> AppResult<Option<String>> {
        self.ensure_synced().await?;
        let result = self.get_inner(key).await;
        self.poison_on_err(result)
    }

    async fn set(&mut self, key: &str, value: &str, flags: u32, expire: i64) -> AppResult<bool> {
        self.ensure_synced().await?;
        let result = self.set_inner(key, value, flags, expire).await;
        self.poison_on_err(result)
    }

    async fn delete(&mut self, key: &str) -> AppResult<bool> {
        self.ensure_synced().await?;
        let result = self.delete_inner(key).await;
        self.poison_on_err(result)
    }

    async fn flush(&mut self) -> AppResult<bool> {
        self.ensure_synced().await?;
        let result = self.flush_inner().await;
        self.poison_on_err(result)
    }

    async fn stats(&mut self) -> AppResult<StatsSnapshot> {
        self.ensure_synced().await?;
        let result = self.stats_inner().await;
        self.poison_on_err(result)
    }

    async fn slab_classes(&mut self) -> AppResult<Vec<SlabGroup>> {
        self.ensure_synced().await?;
        let result = self.slab_classes_inner().await;
        self.poison_on_err(result)
    }

    async fn dump_keys(&mut self, slab_id: u32, limit: u32) -> AppResult<Vec<DumpedKey>> {
        self.ensure_synced().await?;
        let result = self.dump_keys_inner(slab_id, limit).await;
        self.poison_on_err(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    use crate::domain::services::SnapshotBuilder;

    /// A scripted memcached stand-in. Accepts any number of connections
    /// and answers each command from a fixed table, including one
    /// cachedump reply with a garbage line in the middle of it.
    async fn spawn_scripted_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut stream = BufReader::new(stream);
                    let mut line = String::new();
                    loop {
                        line.clear();
                        if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
                            break;
                        }
                        let reply = match line.trim_end() {
                            "stats slabs" => {
                                "STAT 1:chunk_size 96\r\nSTAT 2:chunk_size 120\r\nEND\r\n"
                            },
                            "stats cachedump 1 1000" => {
                                "ITEM first [4 b; 0 s]\r\nnot an item line\r\n\
                                 ITEM stale_leftover [5 b; 0 s]\r\nEND\r\n"
                            },
                            "stats cachedump 2 1000" => "ITEM survivor [5 b; 0 s]\r\nEND\r\n",
                            "get survivor" => "VALUE survivor 0 5\r\nhello\r\nEND\r\n",
                            "stats" => "STAT curr_items 2\r\nEND\r\n",
                            _ => "ERROR\r\n",
                        };
                        if stream.get_mut().write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        port
    }

    /// A garbage line mid-dump must not leave the rest of that reply
    /// sitting on the stream, where the next command would read it as its
    /// own reply. The scan drops only the broken slab; later slabs and the
    /// stats fetch see clean replies.
    #[tokio::test]
    async fn malformed_dump_line_does_not_corrupt_later_commands() {
        let port = spawn_scripted_server().await;
        let mut client = MemcacheClient::connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();

        let snapshot = SnapshotBuilder::new().build(&mut client).await;

        let keys: Vec<&str> = snapshot.entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["survivor"]);
        assert_eq!(snapshot.entries["survivor"].value, "hello");
        assert_eq!(snapshot.stats.get("curr_items"), Some("2"));
    }

    #[tokio::test]
    async fn commands_recover_after_a_protocol_error() {
        let port = spawn_scripted_server().await;
        let mut client = MemcacheClient::connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(client.dump_keys(1, 1000).await.is_err());

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.get("curr_items"), Some("2"));
    }

    #[test]
    fn parses_dump_line_with_expiry() {
        let dumped = parse_dump_line("ITEM session:42 [120 b; 1700000000 s]").unwrap();
        assert_eq!(dumped.key, "session:42");
        assert_eq!(dumped.size_bytes, 120);
        assert_eq!(dumped.expires_at, 1_700_000_000);
    }

    #[test]
    fn parses_dump_line_without_expiry() {
        let dumped = parse_dump_line("ITEM foo [6 b; 0 s]").unwrap();
        assert_eq!(dumped.key, "foo");
        assert_eq!(dumped.expires_at, 0);
    }

    #[test]
    fn rejects_malformed_dump_lines() {
        assert!(parse_dump_line("ITEM foo").is_err());
        assert!(parse_dump_line("ITEM foo [x b; y s]").is_err());
        assert!(parse_dump_line("STAT foo 1").is_err());
    }

    #[test]
    fn groups_slab_stats_by_class_token() {
        let pairs = vec![
            ("1:chunk_size".to_string(), "96".to_string()),
            ("1:used_chunks".to_string(), "3".to_string()),
            ("2:chunk_size".to_string(), "120".to_string()),
            ("active_slabs".to_string(), "2".to_string()),
            ("total_malloced".to_string(), "2097152".to_string()),
        ];

        let groups = group_slab_stats(pairs);
        let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "active_slabs", "total_malloced"]);
        assert_eq!(groups[0].fields.len(), 2);
        assert_eq!(groups[0].fields[0], ("chunk_size".to_string(), "96".to_string()));
    }
}
