//! Property tests for inventory rendering.

use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

use ovnci_engine::{Cluster, InventoryBuilder, Node, OsFamily};
use ovnci_utils::{ClusterError, OvnCiError};

fn builder() -> InventoryBuilder {
    InventoryBuilder::new("Admin", "kubernetes", "/tmp/ovnci").unwrap()
}

fn cluster(linux: usize, windows: usize) -> Cluster {
    let mut cluster = Cluster::new();
    let mut octet = 1u8;
    let mut next_ip = || {
        octet += 1;
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, octet))
    };
    for i in 0..linux {
        cluster.push(Node::new(format!("lin{i}"), OsFamily::Linux).with_floating_ip(next_ip()));
    }
    for i in 0..windows {
        let mut node = Node::new(format!("win{i}"), OsFamily::Windows).with_floating_ip(next_ip());
        node.set_admin_password(format!("pw-{i}"));
        cluster.push(node);
    }
    cluster
}

/// Lines of the `[name]` section, up to the next blank line.
fn section<'a>(groups: &'a str, name: &str) -> Vec<&'a str> {
    let header = format!("[{name}]");
    groups
        .lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .collect()
}

proptest! {
    #[test]
    fn prop_groups_partition_nodes(linux in 1usize..8, windows in 0usize..8) {
        let artifact = builder().build(&cluster(linux, windows)).unwrap();

        let master = section(&artifact.groups, "kube-master");
        let minions = section(&artifact.groups, "kube-minions-linux");
        let win = section(&artifact.groups, "kube-minions-windows");

        prop_assert_eq!(master, vec!["lin0"]);
        let expected_minions: Vec<String> = (1..linux).map(|i| format!("lin{i}")).collect();
        prop_assert_eq!(minions, expected_minions);
        let expected_windows: Vec<String> = (0..windows).map(|i| format!("win{i}")).collect();
        prop_assert_eq!(win, expected_windows);
        prop_assert_eq!(artifact.host_vars.len(), windows);
    }

    #[test]
    fn prop_hosts_entries_one_line_per_node(linux in 1usize..8, windows in 0usize..8) {
        let artifact = builder().build(&cluster(linux, windows)).unwrap();
        let lines: Vec<&str> = artifact.hosts_entries.lines().collect();

        prop_assert_eq!(lines.len(), linux + windows);
        for (i, line) in lines.iter().enumerate() {
            let tokens: Vec<&str> = line.split(' ').collect();
            prop_assert!(tokens[0].parse::<IpAddr>().is_ok());
            if i == 0 {
                prop_assert_eq!(tokens.len(), 3);
                prop_assert_eq!(tokens[2], "kubernetes");
            } else {
                prop_assert_eq!(tokens.len(), 2);
            }
        }
    }

    #[test]
    fn prop_malformed_iff_no_linux(windows in 0usize..6) {
        let result = builder().build(&cluster(0, windows));
        let is_malformed = matches!(
            result,
            Err(OvnCiError::Cluster(ClusterError::MalformedCluster { .. }))
        );
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_password_round_trips_through_yaml(password in "[ -~]{1,32}") {
        let mut cluster = cluster(1, 0);
        let mut node = Node::new("win0", OsFamily::Windows)
            .with_floating_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 1, 1)));
        node.set_admin_password(password.clone());
        cluster.push(node);

        let artifact = builder().build(&cluster).unwrap();
        let content = &artifact.host_vars[0].content;
        let line = content.lines().nth(1).unwrap();
        let value = line.strip_prefix("ansible_password: ").unwrap();

        prop_assert_eq!(serde_json::from_str::<String>(value).unwrap(), password);
    }
}
