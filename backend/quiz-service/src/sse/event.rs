use actix_web::web::Bytes;
use std::fmt::Write;

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub id: String,
    pub name: String,
    pub data: String,
}

impl SseEvent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data: data.into(),
        }
    }

    /// Wire frame: `id:`, `event:` and one `data:` line per payload line,
    /// closed by a blank line
    pub fn to_frame(&self) -> Bytes {
        let mut frame = String::with_capacity(self.data.len() + self.id.len() + 32);
        let _ = writeln!(frame, "id:{}", self.id);
        let _ = writeln!(frame, "event:{}", self.name);
        for line in self.data.split('\n') {
            let _ = writeln!(frame, "data:{}", line.trim_end_matches('\r'));
        }
        frame.push('\n');
        Bytes::from(frame)
    }
}

/// Timestamp part of an `"{userId}_{millis}"` id
pub fn id_timestamp(id: &str) -> Option<i64> {
    id.rsplit_once('_')
        .and_then(|(_, millis)| millis.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let event = SseEvent::new("u_1", "sse", "hello");
        assert_eq!(&event.to_frame()[..], b"id:u_1\nevent:sse\ndata:hello\n\n");
    }

    #[test]
    fn multiline_data_gets_one_data_line_each() {
        let event = SseEvent::new("u_1", "notification", "a\r\nb");
        assert_eq!(
            &event.to_frame()[..],
            b"id:u_1\nevent:notification\ndata:a\ndata:b\n\n"
        );
    }

    #[test]
    fn timestamps_parse_from_ids() {
        assert_eq!(id_timestamp("4f1c_1700000000123"), Some(1_700_000_000_123));
        assert_eq!(id_timestamp("no-separator"), None);
        assert_eq!(id_timestamp("user_abc"), None);
    }
}
