// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Seed transfer command templates.

/// Fixed port both ends of a seed transfer agree on.
pub const SEED_TRANSFER_PORT: u16 = 21234;

/// `<ReceiveSeedDataCommand> <datadir> <port>`
pub fn receive_command(template: &str, datadir: &str) -> String {
    format!("{} {} {}", template, datadir, SEED_TRANSFER_PORT)
}

/// `<SendSeedDataCommand> <directory> <target host> <port>`
pub fn send_command(template: &str, directory: &str, target_host: &str) -> String {
    format!(
        "{} {} {} {}",
        template, directory, target_host, SEED_TRANSFER_PORT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_append_fixed_port() {
        assert_eq!(
            receive_command("/usr/local/bin/receive", "/var/lib/mysql"),
            "/usr/local/bin/receive /var/lib/mysql 21234"
        );
        assert_eq!(
            send_command("/usr/local/bin/send", "/mnt/snap/mysql", "db-2"),
            "/usr/local/bin/send /mnt/snap/mysql db-2 21234"
        );
    }
}
