use anyhow::Result;
use hannk_rs::{Bounds, DType, Interval, QuantizationInfo};
use serde_json::json;

#[test]
fn tensor_metadata_serializes_for_external_tooling() -> Result<()> {
    let quantization = QuantizationInfo {
        dimension: 3,
        scale: vec![0.5, 0.25],
        zero: vec![128, 127],
    };
    let value = serde_json::to_value(&quantization)?;
    assert_eq!(
        value,
        json!({ "dimension": 3, "scale": [0.5, 0.25], "zero": [128, 127] })
    );
    assert_eq!(
        serde_json::from_value::<QuantizationInfo>(value)?,
        quantization
    );

    let bounds = Bounds::new([Interval::new(-1, 4), Interval::new(0, 0)]);
    let decoded: Bounds = serde_json::from_str(&serde_json::to_string(&bounds)?)?;
    assert_eq!(decoded, bounds);

    assert_eq!(serde_json::to_value(DType::U8)?, json!("U8"));
    Ok(())
}
