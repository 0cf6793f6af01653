//! Lane packing for source routes.
//!
//! Each hop occupies one 16-bit lane: bit 15 is the bottom-of-stack flag
//! (set only on the last hop) and bits 0..15 carry the output port. Lane `i`
//! is shifted left by `16 * i`, so the first hop lands in the least
//! significant lane and is the first tag the switch pops.
//!
//! ```text
//! ports [1, 2]
//!   lane0 = (0 << 15) | 1 = 0x0001
//!   lane1 = (1 << 15) | 2 = 0x8002
//!   route_data = 0x8002_0001 (32 bits, append_2_tags)
//! ```

use srcroute_p4rt::{AppendTags, TableAction, TableEntry, MAX_HOPS, MIN_HOPS};

use super::orch::RouteError;
use super::types::{DecodedHop, EncodedRoute};

/// Bottom-of-stack flag within a lane.
pub const BOS_BIT: u16 = 0x8000;

/// Largest port that fits beside the bottom-of-stack flag.
pub const MAX_PORT: u16 = 0x7fff;

/// Packs `ports` into route data.
///
/// # Errors
///
/// - [`RouteError::InvalidHopCount`] unless `2 <= ports.len() <= 9`
/// - [`RouteError::PortOutOfRange`] if a port would spill into the flag bit
pub fn encode(ports: &[u32]) -> Result<EncodedRoute, RouteError> {
    let action = AppendTags::for_hop_count(ports.len())
        .ok_or(RouteError::InvalidHopCount(ports.len()))?;

    let last = ports.len() - 1;
    let mut data = vec![0u8; action.byte_width()];

    for (index, &port) in ports.iter().enumerate() {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p <= MAX_PORT)
            .ok_or(RouteError::PortOutOfRange { index, port })?;

        let lane = if index == last { BOS_BIT | port } else { port };
        let end = data.len() - 2 * index;
        data[end - 2..end].copy_from_slice(&lane.to_be_bytes());
    }

    Ok(EncodedRoute::new(action, data))
}

/// Unpacks an encoded route back into its hops.
pub fn decode(route: &EncodedRoute) -> Vec<DecodedHop> {
    // An EncodedRoute always carries exactly hop_count lanes.
    decode_bytes(route.as_bytes(), route.hop_count()).unwrap_or_default()
}

/// Unpacks `hop_count` lanes from the low end of `data`.
///
/// Returns `None` when `data` is too short to hold that many lanes or when
/// `hop_count` is outside `2..=9`.
pub fn decode_bytes(data: &[u8], hop_count: usize) -> Option<Vec<DecodedHop>> {
    if !(MIN_HOPS..=MAX_HOPS).contains(&hop_count) || data.len() < 2 * hop_count {
        return None;
    }

    let hops = (0..hop_count)
        .map(|index| {
            let end = data.len() - 2 * index;
            let lane = u16::from_be_bytes([data[end - 2], data[end - 1]]);
            DecodedHop {
                port: lane & MAX_PORT,
                is_last: lane & BOS_BIT != 0,
            }
        })
        .collect();
    Some(hops)
}

/// Recovers the hop list from a forwarding entry read back from a switch.
///
/// Returns `None` for entries that do not push a tag stack.
pub fn decode_entry(entry: &TableEntry) -> Option<Vec<DecodedHop>> {
    match &entry.action {
        TableAction::AppendTags { action, route_data } => {
            decode_bytes(route_data, action.hop_count())
        }
        TableAction::Drop => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ports(hops: &[DecodedHop]) -> Vec<u16> {
        hops.iter().map(|h| h.port).collect()
    }

    #[test]
    fn test_encode_two_hops() {
        let route = encode(&[1, 2]).unwrap();

        assert_eq!(route.action(), AppendTags::Append2);
        assert_eq!(route.bitwidth(), 32);
        assert_eq!(route.as_bytes(), &[0x80, 0x02, 0x00, 0x01]);
        assert_eq!(route.to_u128(), Some(2_147_614_721));
        assert_eq!(route.to_string(), "0x80020001");
    }

    #[test]
    fn test_encode_three_hops() {
        let route = encode(&[7, 3, 9]).unwrap();

        assert_eq!(route.action(), AppendTags::Append3);
        assert_eq!(route.bitwidth(), 48);
        assert_eq!(route.as_bytes(), &[0x80, 0x09, 0x00, 0x03, 0x00, 0x07]);
        assert_eq!(route.lane(0), Some(0x0007));
        assert_eq!(route.lane(1), Some(0x0003));
        assert_eq!(route.lane(2), Some(0x8009));
        assert_eq!(route.lane(3), None);
    }

    #[test]
    fn test_encode_nine_hops_exceeds_u128() {
        let route = encode(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();

        assert_eq!(route.action(), AppendTags::Append9);
        assert_eq!(route.bitwidth(), 144);
        assert_eq!(route.as_bytes().len(), 18);
        assert_eq!(route.to_u128(), None);
        // Final hop flagged, first hop in the lowest lane.
        assert_eq!(&route.as_bytes()[..2], &[0x80, 0x09]);
        assert_eq!(&route.as_bytes()[16..], &[0x00, 0x01]);
    }

    #[test]
    fn test_encode_rejects_hop_counts() {
        assert!(matches!(encode(&[]), Err(RouteError::InvalidHopCount(0))));
        assert!(matches!(encode(&[5]), Err(RouteError::InvalidHopCount(1))));
        assert!(matches!(
            encode(&[1; 10]),
            Err(RouteError::InvalidHopCount(10))
        ));
    }

    #[test]
    fn test_encode_rejects_port_in_flag_bit() {
        assert!(encode(&[1, 32767]).is_ok());
        assert!(matches!(
            encode(&[1, 32768]),
            Err(RouteError::PortOutOfRange {
                index: 1,
                port: 32768
            })
        ));
        assert!(matches!(
            encode(&[70000, 1]),
            Err(RouteError::PortOutOfRange {
                index: 0,
                port: 70000
            })
        ));
    }

    #[test]
    fn test_zero_port_is_valid() {
        let route = encode(&[0, 0]).unwrap();
        assert_eq!(route.as_bytes(), &[0x80, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_recovers_order_and_flag() {
        let route = encode(&[4, 1, 3, 2]).unwrap();
        let hops = decode(&route);

        assert_eq!(ports(&hops), vec![4, 1, 3, 2]);
        let flags: Vec<bool> = hops.iter().map(|h| h.is_last).collect();
        assert_eq!(flags, vec![false, false, false, true]);
    }

    #[test]
    fn test_round_trip_every_hop_count() {
        const EDGES: [u32; 4] = [0, 1, 32766, 32767];

        for hops in 2..=9 {
            let mut cases: Vec<Vec<u32>> = EDGES.iter().map(|&p| vec![p; hops]).collect();
            cases.push((0..hops).map(|i| EDGES[i % EDGES.len()]).collect());
            cases.push((0..hops).map(|i| EDGES[(i + 3) % EDGES.len()]).collect());

            for input in cases {
                let route = encode(&input).unwrap();
                assert_eq!(route.hop_count(), hops);
                assert_eq!(route.bitwidth(), 16 * hops as u32);

                let decoded = decode(&route);
                let expected: Vec<u16> = input.iter().map(|&p| p as u16).collect();
                assert_eq!(ports(&decoded), expected, "{input:?}");

                let flags: Vec<bool> = decoded.iter().map(|h| h.is_last).collect();
                let mut last_only = vec![false; hops];
                last_only[hops - 1] = true;
                assert_eq!(flags, last_only, "{input:?}");
            }
        }
    }

    #[test]
    fn test_decode_bytes_bounds() {
        assert_eq!(decode_bytes(&[0x80, 0x02], 2), None);
        assert_eq!(decode_bytes(&[0x80, 0x02, 0x00, 0x01], 1), None);

        // Extra high-order bytes are ignored.
        let hops = decode_bytes(&[0xff, 0x80, 0x02, 0x00, 0x01], 2).unwrap();
        assert_eq!(ports(&hops), vec![1, 2]);
    }

    #[test]
    fn test_decode_entry() {
        let prefix = "10.0.0.2/32".parse().unwrap();
        let entry = encode(&[7, 3, 9]).unwrap().into_entry(prefix);
        let hops = decode_entry(&entry).unwrap();
        assert_eq!(ports(&hops), vec![7, 3, 9]);

        assert_eq!(decode_entry(&TableEntry::default_drop()), None);
    }
}
