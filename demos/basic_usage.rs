//! Basic usage of shmseg: two handles on one named segment

use shmseg::{record, RawAccessor, RecordAccessorExt, Result, Segment, SegmentConfig};

shmseg::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Heartbeat {
        pub counter: u32,
        pub load: f32,
        pub healthy: bool,
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    println!("shmseg Example");
    println!("==============");

    let name = format!("shmseg_demo_{}", std::process::id());

    // The first handle creates the segment
    let config = SegmentConfig::new(name.clone(), 1024).with_unlink_on_close(true);
    let mut a = Segment::with_config(config)?;
    println!("Segment '{}' ({} bytes)", a.name(), a.size());
    println!("  a.already_existed = {}", a.already_existed());

    // The second one attaches to it
    let mut b = Segment::open(&name, 1024)?;
    println!("  b.already_existed = {}", b.already_existed());

    // Raw bytes
    a.write_from(0, &[1, 2, 3])?;
    println!("\nb reads {:?}", b.read(0, 3)?);

    match b.read(1020, 8) {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("Reading past the end fails with code {}: {}", e.code(), e),
    }

    // Fixed-layout record at offset 0
    let beat = Heartbeat {
        counter: 7,
        load: 0.25,
        healthy: true,
    };
    b.write_record(&beat)?;
    let seen: Heartbeat = a.read_record()?;
    println!("\na reads {:?}", seen);
    println!("encoded as {:02x?}", record::encode(&seen)?);

    b.close();
    drop(a);
    println!("\nSegments closed");

    Ok(())
}
