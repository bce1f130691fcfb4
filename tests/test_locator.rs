//! Integration tests for the strategy front end.

mod common;

use std::sync::Arc;

use gcp_locator::{DebugConfig, GcpConfig};

use common::*;

fn locator(strategy: Strategy) -> GcpLocator<MemorySource> {
    let source = memory_source(&[
        ("gcp_cascade.xml", silent_cascade_xml()),
        ("gcp_cascade_alt.xml", edge_cascade_xml()),
    ]);
    let config = GcpConfig::default();
    let store = Arc::new(ClassifierStore::new(source, config.models.clone()));
    GcpLocator::new(strategy, ColorPairDetector::with_params(config.color), store)
}

#[tokio::test]
async fn test_color_pair_strategy() -> anyhow::Result<()> {
    let detection = locator(Strategy::ColorPair).locate(&framed_marker_image()).await?;
    assert_eq!(detection, Detection::Found(vec![Point::new(58.0, 62.0)]));
    assert_eq!(detection.points().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_blank_image_not_found_by_either_strategy() -> anyhow::Result<()> {
    for strategy in [Strategy::ColorPair, Strategy::Cascade] {
        let detection = locator(strategy).locate(&blank_image()).await?;
        assert_eq!(detection, Detection::NotFound);
        assert!(!detection.is_found());
    }
    Ok(())
}

#[tokio::test]
async fn test_cascade_strategy_reports_single_point() -> anyhow::Result<()> {
    let detection = locator(Strategy::Cascade).locate(&edge_image()).await?;
    assert!(detection.is_found());
    assert_eq!(detection.points().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_color_only_locator_rejects_cascade() -> anyhow::Result<()> {
    let mut locator: GcpLocator<MemorySource> = GcpLocator::color_only(ColorPairDetector::new());
    assert!(locator.locate(&isolated_blob_image()).await?.is_found());

    locator.strategy = Strategy::Cascade;
    let err = locator.locate(&isolated_blob_image()).await.unwrap_err();
    assert!(matches!(err, GcpError::CascadeUnavailable));
    Ok(())
}

#[tokio::test]
async fn test_debug_masks_are_written() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = dir.path().join("debug");

    let locator = locator(Strategy::ColorPair).with_debug(DebugConfig::new(out.clone())?);
    locator.locate(&framed_marker_image()).await?;

    for name in ["white_mask.png", "black_mask.png", "pair_01_overlap.png"] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    // a used directory is refused
    assert!(DebugConfig::new(out).is_err());
    Ok(())
}
