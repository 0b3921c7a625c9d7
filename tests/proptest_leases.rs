use std::collections::HashMap;

use chrono::{Datelike, TimeDelta, TimeZone, Timelike, Utc};
use proptest::prelude::*;

use dhcpd_leases::escape::decode_escaped;
use dhcpd_leases::time::parse_timestamp;
use dhcpd_leases::{Lease, Leases};

const MACS: [&str; 3] = ["00:00:00:00:00:01", "00:00:00:00:00:02", "00:00:00:00:00:03"];

fn v4_block(index: usize, mac: Option<&str>, state: &str, ends: &str) -> String {
    let mut block = format!(
        "lease 10.0.{}.{} {{\n  starts 1 2015/07/06 00:00:00;\n  ends {};\n  binding state {};\n",
        index / 256,
        index % 256,
        ends,
        state
    );
    if let Some(mac) = mac {
        block.push_str(&format!("  hardware ethernet {};\n", mac));
    }
    block.push_str("}\n");
    block
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn timestamp_fields_round_trip(
        weekday in 0u32..7,
        year in 1970i32..2100,
        month in 1u32..=12,
        day in 1u32..=28,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
    ) {
        let text = format!(
            "{} {:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            weekday, year, month, day, hour, minute, second
        );
        let parsed = parse_timestamp(&text).unwrap();
        prop_assert_eq!(parsed.year(), year);
        prop_assert_eq!(parsed.month(), month);
        prop_assert_eq!(parsed.day(), day);
        prop_assert_eq!(parsed.hour(), hour);
        prop_assert_eq!(parsed.minute(), minute);
        prop_assert_eq!(parsed.second(), second);
    }

    #[test]
    fn parse_timestamp_never_panics(text in ".*") {
        let _ = parse_timestamp(&text);
    }

    #[test]
    fn octal_escapes_decode_one_byte_each(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let escaped: String = bytes.iter().map(|byte| format!("\\{:03o}", byte)).collect();
        let decoded = decode_escaped(&escaped).unwrap();
        prop_assert_eq!(decoded.len(), bytes.len());
        prop_assert_eq!(decoded, bytes);
    }

    #[test]
    fn text_without_escapes_passes_through(text in "[ -!#-\\[\\]-~]{0,64}") {
        let decoded = decode_escaped(&text).unwrap();
        prop_assert_eq!(decoded, text.as_bytes().to_vec());
    }

    #[test]
    fn only_blocks_with_hardware_are_leases(has_hardware in prop::collection::vec(any::<bool>(), 0..40)) {
        let text: String = has_hardware
            .iter()
            .enumerate()
            .map(|(index, &hardware)| {
                v4_block(index, hardware.then_some(MACS[index % MACS.len()]), "active", "never")
            })
            .collect();
        let leases = Leases::parse(&text).unwrap();
        let expected = has_hardware.iter().filter(|&&hardware| hardware).count();
        prop_assert_eq!(leases.len(), expected);
    }

    #[test]
    fn current_keeps_last_valid_active_per_key(
        blocks in prop::collection::vec((0usize..3, any::<bool>(), any::<bool>()), 0..30)
    ) {
        let now = Utc.with_ymd_and_hms(2015, 7, 6, 8, 15, 0).unwrap();
        let text: String = blocks
            .iter()
            .enumerate()
            .map(|(index, &(mac, active, expired))| {
                let state = if active { "active" } else { "free" };
                let ends = if expired { "1 2015/07/06 08:00:00" } else { "1 2015/07/06 09:00:00" };
                v4_block(index, Some(MACS[mac]), state, ends)
            })
            .collect();

        let mut expected: HashMap<&str, usize> = HashMap::new();
        for (index, &(mac, active, expired)) in blocks.iter().enumerate() {
            if active && !expired {
                expected.insert(MACS[mac], index);
            }
        }

        let leases = Leases::parse(&text).unwrap();
        let current = leases.current(now);
        prop_assert_eq!(current.len(), expected.len());
        for (mac, index) in expected {
            let lease = current[mac].as_v4().unwrap();
            prop_assert_eq!(lease.address.octets()[3] as usize, index % 256);
        }
    }

    #[test]
    fn never_ending_leases_stay_valid(offset_seconds in 0i64..4_000_000_000) {
        let text = "\
lease 10.0.0.1 {
  starts 1 2015/07/06 00:00:00;
  ends never;
  binding state active;
  hardware ethernet 00:00:00:00:00:01;
}
ia-na \"\\001\\000\\000\\000\\000\\001\" {
  cltt 1 2015/07/06 00:00:00;
  iaaddr 2001:db8::1 {
    binding state active;
    preferred-life 375;
    max-life 600;
    ends never;
  }
}
";
        let starts = Utc.with_ymd_and_hms(2015, 7, 6, 0, 0, 0).unwrap();
        let leases = Leases::parse(text).unwrap();
        let later = starts + TimeDelta::seconds(offset_seconds);
        let earlier = starts - TimeDelta::seconds(offset_seconds.max(1));

        for lease in &leases {
            match lease {
                Lease::V4(lease) => {
                    prop_assert!(lease.is_valid(later));
                    prop_assert!(!lease.is_valid(earlier));
                }
                Lease::V6(lease) => {
                    prop_assert!(lease.is_valid(later));
                    prop_assert!(lease.is_valid(earlier));
                }
            }
        }
    }

    #[test]
    fn parse_never_panics_on_arbitrary_text(text in ".{0,512}") {
        let _ = Leases::parse(&text);
    }

    #[test]
    fn parse_never_panics_on_truncated_files(cut in 0usize..400) {
        let text = "\
lease 10.0.0.1 {
  starts 1 2015/07/06 00:00:00;
  binding state active;
  hardware ethernet 00:00:00:00:00:01;
  client-hostname \"host{}\";
}
ia-pd \"\\001\\000\\000\\000\\\"\" {
  cltt 1 2015/07/06 00:00:00;
  iaprefix 2001:db8::/48 {
    binding state active;
    preferred-life 375;
    max-life 600;
  }
}
";
        let end = cut.min(text.len());
        let _ = Leases::parse(&text[..end]);
    }

    #[test]
    fn parse_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Leases::parse_bytes(&bytes);
    }
}
