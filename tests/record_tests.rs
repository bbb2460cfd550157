//! Integration tests for fixed-layout records in shared segments

use std::sync::atomic::{AtomicUsize, Ordering};

use shmseg::{
    record::{self, Record},
    AccessError, RawAccessor, RecordAccessorExt, RecordError, Segment, SegmentConfig,
};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct ShmName(String);

impl ShmName {
    fn new(tag: &str) -> Self {
        Self(format!(
            "shmseg_rec_{}_{}_{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }
}

impl Drop for ShmName {
    fn drop(&mut self) {
        let _ = Segment::remove(&self.0);
    }
}

shmseg::record! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Vec3 {
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }
}

shmseg::record! {
    /// State published by a controller process
    #[derive(Debug, Clone, PartialEq)]
    pub struct ControllerState {
        pub sequence: u64,
        pub position: Vec3,
        pub velocity: Vec3,
        pub mode: u8,
        pub enabled: bool,
        pub errors: [i16; 4],
        pub name: [u8; 16],
    }
}

fn sample_state() -> ControllerState {
    let mut name = [0u8; 16];
    name[..5].copy_from_slice(b"arm-1");
    ControllerState {
        sequence: 9_000_000_001,
        position: Vec3 {
            x: 1.0,
            y: -2.5,
            z: 0.125,
        },
        velocity: Vec3 {
            x: 0.0,
            y: 0.0,
            z: -9.81,
        },
        mode: 3,
        enabled: true,
        errors: [0, -1, 200, i16::MIN],
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_layout_size() {
        assert_eq!(Vec3::SIZE, 12);
        assert_eq!(ControllerState::SIZE, 8 + 12 + 12 + 1 + 1 + 8 + 16);
        assert_eq!(record::encode(&sample_state()).unwrap().len(), ControllerState::SIZE);
    }

    #[test]
    fn test_write_then_read_record() {
        let name = ShmName::new("roundtrip");
        let mut segment = Segment::open(&name.0, 1024).unwrap();

        segment.write_record(&sample_state()).unwrap();
        let back: ControllerState = segment.read_record().unwrap();
        assert_eq!(back, sample_state());
    }

    #[test]
    fn test_record_visible_to_other_handle() {
        let name = ShmName::new("shared");
        let mut publisher = Segment::open(&name.0, 1024).unwrap();
        let subscriber = Segment::open(&name.0, 1024).unwrap();

        let mut state = sample_state();
        publisher.write_record(&state).unwrap();
        assert_eq!(subscriber.read_record::<ControllerState>().unwrap(), state);

        state.sequence += 1;
        state.enabled = false;
        record::write_record(&mut publisher, &state).unwrap();
        let seen: ControllerState = record::read_record(&subscriber).unwrap();
        assert_eq!(seen.sequence, 9_000_000_002);
        assert!(!seen.enabled);
    }

    #[test]
    fn test_record_starts_at_offset_zero() {
        let name = ShmName::new("offset");
        let mut segment = Segment::open(&name.0, 256).unwrap();

        segment.write_record(&0xDEADBEEFu32).unwrap();
        assert_eq!(segment.read(0, 4).unwrap(), vec![0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(segment.read_record::<u32>().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_raw_garbage_fails_decode() {
        let name = ShmName::new("garbage");
        let mut segment = Segment::open(&name.0, 256).unwrap();

        let mut bytes = record::encode(&sample_state()).unwrap();
        bytes[33] = 0x7F; // `enabled` is neither 0 nor 1
        segment.write_from(0, &bytes).unwrap();

        let err = segment.read_record::<ControllerState>().unwrap_err();
        assert!(matches!(err, RecordError::Codec(_)));
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_record_does_not_fit() {
        let name = ShmName::new("small");
        let mut segment = Segment::open(&name.0, 16).unwrap();

        let err = segment.write_record(&sample_state()).unwrap_err();
        assert_eq!(err.code(), 2);
        assert!(segment.read_record::<ControllerState>().is_err());
    }

    #[test]
    fn test_record_before_init() {
        let mut segment = Segment::new();
        assert_eq!(segment.read_record::<u64>().unwrap_err().code(), 1);
        assert_eq!(segment.write_record(&1u64).unwrap_err().code(), 1);
    }

    #[test]
    fn test_record_write_to_read_only_segment() {
        let name = ShmName::new("ro");
        let mut owner = Segment::open(&name.0, 64).unwrap();
        owner.write_record(&0x0102_0304u32).unwrap();

        let mut observer =
            Segment::with_config(SegmentConfig::new(name.0.clone(), 64).observer()).unwrap();
        assert_eq!(observer.read_record::<u32>().unwrap(), 0x0102_0304);

        let err = observer.write_record(&7u32).unwrap_err();
        assert_eq!(err, RecordError::Access(AccessError::ReadOnly));
        assert_eq!(err.code(), 4);
        assert_eq!(owner.read_record::<u32>().unwrap(), 0x0102_0304);
    }
}
