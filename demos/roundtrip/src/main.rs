use argh::FromArgs;
use std::path::PathBuf;

use imbridge::{
    image::{Image, ImageGeometry, ImageSize, MetaDataDictionary, Scalar},
    io::{BufferRegistry, CodecConfig, ImageDecoder, ImageEncoder},
    tensor::CpuAllocator,
};

#[derive(FromArgs)]
/// Encode a synthetic image to JSON and decode it back without copying the pixels
struct Args {
    /// image width (default: 4)
    #[argh(option, default = "4")]
    width: usize,

    /// image height (default: 3)
    #[argh(option, default = "3")]
    height: usize,

    /// image name
    #[argh(option, short = 'n', default = "String::from(\"ramp\")")]
    name: String,

    /// path to a JSON codec config
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// print the encoded JSON
    #[argh(switch, short = 'p')]
    print: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => CodecConfig::from_file(path)?,
        None => CodecConfig::default(),
    };

    // a float ramp with some geometry and metadata
    let size = ImageSize::from([args.width, args.height]);
    let data = (0..size.num_pixels()).map(|i| i as f32 * 0.5).collect();
    let mut metadata = MetaDataDictionary::new();
    metadata.insert("generator", "imbridge roundtrip demo");
    metadata.insert("spacing_mm", vec![0.8f64, 0.8]);

    let image = Image::<Scalar<f32>, 2>::new(size, data, CpuAllocator)?
        .with_name(args.name)
        .with_metadata(metadata)
        .with_geometry(ImageGeometry {
            origin: [-10.0, 5.0],
            spacing: [0.8, 0.8],
            direction: [[1.0, 0.0], [0.0, 1.0]],
        });

    let mut registry = BufferRegistry::new();
    let json = ImageEncoder::new(&mut registry)
        .with_config(config.clone())
        .encode(&image)?;
    log::info!("encoded {} bytes of JSON, {} buffers registered", json.len(), registry.len());

    if args.print {
        println!("{json}");
    }

    let decoded: Image<Scalar<f32>, 2> = ImageDecoder::new(&registry)
        .with_config(config)
        .decode(&json)?;

    let shared = decoded.as_slice().as_ptr() == image.as_slice().as_ptr();
    log::info!(
        "decoded {:?} of size {} ({:?}, shares pixels: {shared})",
        decoded.name(),
        decoded.size(),
        decoded.ownership()
    );

    if decoded.as_slice() != image.as_slice() || decoded.metadata() != image.metadata() {
        return Err("decoded image differs from the encoded one".into());
    }

    Ok(())
}
