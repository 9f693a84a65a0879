use std::io::Write;

use approx::assert_relative_eq;
use imbridge_image::{
    ComponentTag, Image, ImageGeometry, ImageSize, MetaDataDictionary, MetadataValue, PixelTag,
    Rgb, Scalar, VariableLengthVector, Vector,
};
use imbridge_io::{
    decode_image, encode_image, BufferHandle, BufferRef, BufferRegistry, CodecConfig, CodecError,
    Descriptor, DirectionEncoding, ImageDecoder, ImageEncoder, MetadataPolicy, RegisteredBuffer,
};
use imbridge_tensor::{CpuAllocator, Ownership};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const EXAMPLE: &str = r#"{
    "imageType": {"dimension": 2, "componentType": "uint8", "pixelType": "Scalar", "components": 1},
    "origin": [0, 0],
    "spacing": [1, 1],
    "direction": [[1, 0], [0, 1]],
    "size": [2, 2],
    "data": "data:application/vnd.itk.address,0:1234567890"
}"#;

fn example_registry() -> Result<BufferRegistry, CodecError> {
    let mut registry = BufferRegistry::new();
    registry.insert(
        BufferRef::Address(BufferHandle(1234567890)),
        RegisteredBuffer::from_vec(vec![11u8, 12, 21, 22], CpuAllocator)?,
    );
    Ok(registry)
}

#[test]
fn end_to_end_example() -> Result<(), CodecError> {
    init_logger();
    let registry = example_registry()?;
    let image: Image<Scalar<u8>, 2> = decode_image(EXAMPLE, &registry)?;

    assert_eq!(image.size(), ImageSize::from([2, 2]));
    assert_eq!(image.component_tag(), ComponentTag::UInt8);
    assert_eq!(image.pixel_tag(), PixelTag::Scalar);
    assert_eq!(image.components(), 1);
    assert_eq!(image.as_slice(), &[11, 12, 21, 22]);
    assert_eq!(image.get_pixel([1, 0]), Some(&[12u8][..]));
    assert_eq!(image.get_pixel([0, 1]), Some(&[21u8][..]));
    assert_eq!(image.geometry(), &ImageGeometry::identity());
    assert!(image.metadata().is_empty());
    assert_eq!(image.ownership(), Ownership::Borrowed);
    Ok(())
}

#[test]
fn round_trip_preserves_everything() -> Result<(), CodecError> {
    init_logger();
    let geometry = ImageGeometry {
        origin: [-1.25, 3.5, 100.0],
        spacing: [0.3, 0.3, 1.2],
        direction: [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    };
    let metadata: MetaDataDictionary = [
        ("modality", MetadataValue::from("MR")),
        ("series", MetadataValue::from(7)),
        ("echo_time", MetadataValue::from(0.012)),
        ("labels", MetadataValue::from(vec!["a".to_string(), "b".to_string()])),
        ("window", MetadataValue::from(vec![40i64, 400])),
    ]
    .into_iter()
    .collect();
    let data: Vec<f32> = (0..2 * 3 * 2 * 3).map(|v| v as f32 * 0.5).collect();
    let image = Image::<Vector<f32, 3>, 3>::new(ImageSize::from([2, 3, 2]), data, CpuAllocator)?
        .with_geometry(geometry)
        .with_metadata(metadata)
        .with_name("gradient");

    for encoding in [DirectionEncoding::Buffer, DirectionEncoding::Inline] {
        let mut registry = BufferRegistry::new();
        let config = CodecConfig::default().with_direction_encoding(encoding);
        let json = ImageEncoder::new(&mut registry)
            .with_config(config.clone())
            .encode(&image)?;
        let decoded: Image<Vector<f32, 3>, 3> = ImageDecoder::new(&registry)
            .with_config(config)
            .decode(&json)?;

        assert_eq!(decoded.name(), "gradient");
        assert_eq!(decoded.dimension(), 3);
        assert_eq!(decoded.size(), image.size());
        assert_eq!(decoded.components(), 3);
        assert_eq!(decoded.component_tag(), ComponentTag::Float32);
        assert_eq!(decoded.pixel_tag(), PixelTag::Vector);
        for axis in 0..3 {
            assert_relative_eq!(decoded.geometry().origin[axis], geometry.origin[axis]);
            assert_relative_eq!(decoded.geometry().spacing[axis], geometry.spacing[axis]);
            for col in 0..3 {
                assert_relative_eq!(
                    decoded.geometry().direction[axis][col],
                    geometry.direction[axis][col]
                );
            }
        }
        assert_eq!(decoded.metadata(), image.metadata());
        assert_eq!(decoded.as_slice(), image.as_slice());
    }
    Ok(())
}

#[test]
fn dimension_is_rejected() -> Result<(), CodecError> {
    let registry = example_registry()?;
    let res: Result<Image<Scalar<u8>, 3>, _> = decode_image(EXAMPLE, &registry);
    assert!(matches!(
        res,
        Err(CodecError::TypeMismatch { field: "imageType.dimension", ref expected, ref actual })
            if expected == "3" && actual == "2"
    ));
    Ok(())
}

#[test]
fn tags_are_matched_exactly() -> Result<(), CodecError> {
    let registry = example_registry()?;

    let res: Result<Image<Scalar<i8>, 2>, _> = decode_image(EXAMPLE, &registry);
    assert!(matches!(
        res,
        Err(CodecError::TypeMismatch { field: "imageType.componentType", .. })
    ));

    let res: Result<Image<Rgb<u8>, 2>, _> = decode_image(EXAMPLE, &registry);
    assert!(matches!(
        res,
        Err(CodecError::TypeMismatch { field: "imageType.pixelType", .. })
    ));

    let upper = EXAMPLE.replace("\"uint8\"", "\"UINT8\"");
    let res: Result<Image<Scalar<u8>, 2>, _> = decode_image(&upper, &registry);
    match res {
        Err(CodecError::TypeMismatch { field, expected, actual }) => {
            assert_eq!(field, "imageType.componentType");
            assert_eq!(expected, "uint8");
            assert_eq!(actual, "UINT8");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn variable_components_sentinel() -> Result<(), CodecError> {
    let mut registry = BufferRegistry::new();
    let handle = registry.register_vec(vec![0u16; 2 * 2 * 5])?;
    let json_with = |pixel: &str, components: usize| {
        format!(
            r#"{{"imageType": {{"dimension": 2, "componentType": "uint16", "pixelType": "{pixel}", "components": {components}}},
                "origin": [0, 0], "spacing": [1, 1], "direction": [[1, 0], [0, 1]],
                "size": [2, 2], "data": "{}"}}"#,
            BufferRef::from(handle)
        )
    };

    for components in [1, 2, 5] {
        let image: Image<VariableLengthVector<u16>, 2> =
            decode_image(&json_with("VariableLengthVector", components), &registry)?;
        assert_eq!(image.components(), components);
        assert_eq!(image.as_slice().len(), 4 * components);
    }

    let res: Result<Image<Rgb<u16>, 2>, _> = decode_image(&json_with("RGB", 4), &registry);
    assert!(matches!(
        res,
        Err(CodecError::TypeMismatch { field: "imageType.components", .. })
    ));
    let image: Image<Rgb<u16>, 2> = decode_image(&json_with("RGB", 3), &registry)?;
    assert_eq!(image.get_pixel([1, 1]).map(<[u16]>::len), Some(3));
    Ok(())
}

#[test]
fn buffer_reference_decode_is_pure() -> Result<(), CodecError> {
    let value = "data:application/vnd.itk.address,0:1234567890";
    let first = BufferRef::decode(value)?;
    let second = BufferRef::decode(value)?;
    assert_eq!(first, second);
    assert_eq!(first.encode(), value);
    Ok(())
}

#[test]
fn metadata_order_is_stable() -> Result<(), CodecError> {
    let registry = example_registry()?;
    let json = EXAMPLE.replacen(
        "\"origin\"",
        r#""metadata": {"b": 2, "a": "first", "c": [1.5, 2.5]}, "origin""#,
        1,
    );
    let image: Image<Scalar<u8>, 2> = decode_image(&json, &registry)?;
    assert_eq!(image.metadata().keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);

    let mut registry = BufferRegistry::new();
    let encoded = encode_image(&image, &mut registry)?;
    let descriptor = Descriptor::parse(&encoded)?;
    let keys: Vec<_> = descriptor
        .metadata
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    assert_eq!(keys, vec!["b", "a", "c"]);
    Ok(())
}

#[test]
fn empty_metadata_lists_round_trip() -> Result<(), CodecError> {
    let mut metadata = MetaDataDictionary::new();
    metadata.insert("tags", MetadataValue::StringList(vec![]));
    metadata.insert("ids", MetadataValue::IntegerList(vec![]));
    metadata.insert("weights", Vec::<f64>::new());
    let image = Image::<Scalar<u8>, 1>::new(ImageSize::from([2]), vec![1, 2], CpuAllocator)?
        .with_metadata(metadata);

    let mut registry = BufferRegistry::new();
    let json = encode_image(&image, &mut registry)?;
    assert!(json.contains(r#""metadata":{"tags":[],"ids":[],"weights":[]}"#));

    let decoded: Image<Scalar<u8>, 1> = decode_image(&json, &registry)?;
    assert_eq!(decoded.metadata(), image.metadata());
    assert_eq!(
        decoded.metadata().get("tags"),
        Some(&MetadataValue::FloatList(vec![]))
    );
    Ok(())
}

#[test]
fn config_file_controls_metadata_policy() -> Result<(), CodecError> {
    init_logger();
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(br#"{"metadata_policy": "skip", "direction_encoding": "inline"}"#)?;
    let config = CodecConfig::from_file(file.path())?;
    assert_eq!(config.metadata_policy, MetadataPolicy::Skip);
    assert_eq!(config.direction_encoding, DirectionEncoding::Inline);

    let registry = example_registry()?;
    let json = EXAMPLE.replacen(
        "\"origin\"",
        r#""metadata": {"keep": 1, "drop": true}, "origin""#,
        1,
    );

    let res: Result<Image<Scalar<u8>, 2>, _> = decode_image(&json, &registry);
    assert!(matches!(
        res,
        Err(CodecError::UnsupportedMetadataValue { ref key, .. }) if key == "drop"
    ));

    let image: Image<Scalar<u8>, 2> = ImageDecoder::new(&registry)
        .with_config(config)
        .decode(&json)?;
    assert_eq!(image.metadata().keys().collect::<Vec<_>>(), vec!["keep"]);
    Ok(())
}

#[test]
fn missing_config_file_is_io_error() {
    let res = CodecConfig::from_file("/nonexistent/imbridge/config.json");
    assert!(matches!(res, Err(CodecError::Io(_))));
}

#[test]
fn buffer_type_verification_can_be_disabled() -> Result<(), CodecError> {
    let mut registry = BufferRegistry::new();
    registry.insert(
        BufferRef::Address(BufferHandle(1234567890)),
        RegisteredBuffer::from_vec(vec![1i8, 2, 3, 4], CpuAllocator)?,
    );

    let res: Result<Image<Scalar<u8>, 2>, _> = decode_image(EXAMPLE, &registry);
    assert!(matches!(res, Err(CodecError::BufferMismatch { field: "data", .. })));

    let config = CodecConfig::default().with_verify_buffer_types(false);
    let image: Image<Scalar<u8>, 2> = ImageDecoder::new(&registry)
        .with_config(config)
        .decode(EXAMPLE)?;
    assert_eq!(image.as_slice(), &[1, 2, 3, 4]);
    Ok(())
}

#[test]
fn unknown_buffer_produces_no_image() {
    let registry = BufferRegistry::new();
    let res: Result<Image<Scalar<u8>, 2>, _> = decode_image(EXAMPLE, &registry);
    assert!(matches!(res, Err(CodecError::UnknownBuffer(_))));
}
