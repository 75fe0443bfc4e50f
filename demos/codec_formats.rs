//! Codec format listing
//!
//! Starts the shared engine without audio hardware and prints the video
//! formats each codec advertises, then the full encoder list as JSON.

use peerkit::{GlobalConfig, PeerKit, VideoCodecType, VideoFormatSelector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let peerkit = PeerKit::init_with(GlobalConfig::headless().with_debug_logging(true))?;

    let contexts = peerkit.contexts();
    println!(
        "Engine running on {}, {}, {}",
        contexts.worker.name(),
        contexts.signaling.name(),
        contexts.network.name()
    );

    for codec in [
        VideoCodecType::Vp8,
        VideoCodecType::Vp9,
        VideoCodecType::Av1,
        VideoCodecType::H264,
        VideoCodecType::H265,
    ] {
        let formats = peerkit.supported_video_formats(&VideoFormatSelector::new(codec));
        println!("\n{} ({} formats)", codec, formats.len());
        for format in &formats {
            println!("  {}", format);
        }
    }

    let factory = peerkit.engine_factory();
    println!(
        "\n{}",
        serde_json::to_string_pretty(factory.video_encoder_formats())?
    );

    Ok(())
}
