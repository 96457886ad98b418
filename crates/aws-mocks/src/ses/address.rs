//! Mailbox parsing for sender and recipient addresses, plus the header scan used by raw sends.

/// The bare address of a mailbox: `"Jane <jane@example.com>"` gives `jane@example.com`.
pub fn bare_address(mailbox: &str) -> &str {
    let mailbox = mailbox.trim();
    match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(open), Some(close)) if open < close => mailbox[open + 1..close].trim(),
        _ => mailbox,
    }
}

/// Domain part of a mailbox, lowercased.
pub fn domain_of(mailbox: &str) -> Option<String> {
    bare_address(mailbox)
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
}

/// Why `mailbox` is not a usable address, or `None` when it is.
pub fn address_problem(mailbox: &str) -> Option<&'static str> {
    let address = bare_address(mailbox);
    let mut parts = address.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) if !domain.is_empty() => {}
        _ => return Some("Missing domain"),
    }
    if address.starts_with('@') {
        return Some("Missing local part");
    }
    None
}

/// Display form of a parsed mailbox, `Name <addr>` when a display name is present.
pub fn format_mailbox(name: &str, address: &str) -> String {
    if name.is_empty() {
        address.to_string()
    } else {
        format!("{name} <{address}>")
    }
}

/// A raw MIME message reduced to the headers a send cares about.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RawHeaders {
    pub from: Option<String>,
    /// Every `To`, `Cc` and `Bcc` mailbox, in header order.
    pub recipients: Vec<String>,
}

/// Scans the header block of `raw` (up to the first blank line), unfolding continuations.
pub fn parse_raw_headers(raw: &str) -> RawHeaders {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let mut parsed = RawHeaders::default();
    for (name, value) in headers {
        match name.as_str() {
            "from" => parsed.from = Some(bare_address(&value).to_string()),
            "to" | "cc" | "bcc" => parsed.recipients.extend(
                split_mailboxes(&value)
                    .into_iter()
                    .map(str::trim)
                    .filter(|mailbox| !bare_address(mailbox).is_empty())
                    .map(|mailbox| {
                        let address = bare_address(mailbox);
                        let name = mailbox
                            .find('<')
                            .map(|open| mailbox[..open].trim().trim_matches('"'))
                            .unwrap_or_default();
                        format_mailbox(name, address)
                    }),
            ),
            _ => {}
        }
    }
    parsed
}

/// Splits an address list on the commas that are outside quoted names and `<...>` brackets.
fn split_mailboxes(list: &str) -> Vec<&str> {
    let mut mailboxes = Vec::new();
    let (mut start, mut quoted, mut bracketed) = (0, false, false);
    for (i, c) in list.char_indices() {
        match c {
            '"' if !bracketed => quoted = !quoted,
            '<' if !quoted => bracketed = true,
            '>' if !quoted => bracketed = false,
            ',' if !quoted && !bracketed => {
                mailboxes.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    mailboxes.push(&list[start..]);
    mailboxes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_strips_display_name() {
        assert_eq!(bare_address("Jane Doe <jane@example.com>"), "jane@example.com");
        assert_eq!(bare_address("jane@example.com"), "jane@example.com");
        assert_eq!(domain_of("x@Example.COM").as_deref(), Some("example.com"));
    }

    #[test]
    fn problems() {
        assert_eq!(address_problem("no-domain"), Some("Missing domain"));
        assert_eq!(address_problem("trailing@"), Some("Missing domain"));
        assert_eq!(address_problem("a@b@c"), Some("Missing domain"));
        assert_eq!(address_problem("@example.com"), Some("Missing local part"));
        assert_eq!(address_problem("Name <a@example.com>"), None);
    }

    #[test]
    fn raw_headers_collect_recipients() {
        let raw = "From: Sender <sender@example.com>\r\n\
                   To: a@example.com,\r\n \"Bee\" <b@example.com>\r\n\
                   Cc: c@example.com\r\n\
                   Subject: hi\r\n\
                   \r\n\
                   To: not-a-header@example.com\r\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(headers.from.as_deref(), Some("sender@example.com"));
        assert_eq!(
            headers.recipients,
            vec!["a@example.com", "Bee <b@example.com>", "c@example.com"]
        );
    }

    #[test]
    fn commas_inside_display_names_do_not_split() {
        let headers = parse_raw_headers("To: \"Doe, Jane\" <jane@example.com>, bob@example.com\r\n\r\n");
        assert_eq!(
            headers.recipients,
            vec!["Doe, Jane <jane@example.com>", "bob@example.com"]
        );
    }
}
