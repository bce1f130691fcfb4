//! Haar cascade models in OpenCV's `opencv_storage/cascade` XML layout.
//!
//! Only boosted stages over upright HAAR features are supported.

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct HaarRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
}

/// Split node of a weak classifier tree. Child indices `<= 0` name leaves
/// (`-index`), positive ones name further nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub classifiers: Vec<WeakClassifier>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaarCascade {
    /// Training window size
    pub width: u32,
    pub height: u32,
    pub stages: Vec<Stage>,
    pub features: Vec<HaarFeature>,
}

impl HaarCascade {
    /// Parse cascade XML. The error string describes what was wrong.
    pub fn from_xml(bytes: &[u8]) -> Result<Self, String> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut cascade = HaarCascade::default();
        let mut saw_cascade = false;
        let mut path: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name == "cascade" {
                        saw_cascade = true;
                    }
                    if name == "_" {
                        match path.last().map(String::as_str) {
                            Some("stages") => cascade.stages.push(Stage::default()),
                            Some("weakClassifiers") => cascade
                                .stages
                                .last_mut()
                                .ok_or("weak classifier outside a stage")?
                                .classifiers
                                .push(WeakClassifier::default()),
                            Some("features") => cascade.features.push(HaarFeature::default()),
                            _ => {}
                        }
                    }
                    path.push(name);
                    text.clear();
                }
                Ok(Event::Text(e)) => {
                    let chunk = e.unescape().map_err(|e| format!("bad text: {e}"))?;
                    text.push_str(&chunk);
                }
                Ok(Event::End(_)) => {
                    handle_element(&mut cascade, &path, text.trim())?;
                    path.pop();
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!("xml error at byte {}: {e}", reader.buffer_position()));
                }
                _ => {}
            }
            buf.clear();
        }

        if !saw_cascade {
            return Err("missing <cascade> element".to_string());
        }
        cascade.validate()?;
        Ok(cascade)
    }

    fn validate(&self) -> Result<(), String> {
        if self.width < 3 || self.height < 3 {
            return Err(format!("window {}x{} is too small", self.width, self.height));
        }
        if self.stages.is_empty() {
            return Err("cascade has no stages".to_string());
        }

        for (si, stage) in self.stages.iter().enumerate() {
            if stage.classifiers.is_empty() {
                return Err(format!("stage {si} has no weak classifiers"));
            }
            for (ci, weak) in stage.classifiers.iter().enumerate() {
                if weak.nodes.is_empty() {
                    return Err(format!("stage {si} classifier {ci} has no nodes"));
                }
                for (ni, node) in weak.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        return Err(format!(
                            "stage {si} classifier {ci} references missing feature {}",
                            node.feature
                        ));
                    }
                    // children point strictly forward, so every walk ends at a leaf
                    for child in [node.left, node.right] {
                        let ok = if child > 0 {
                            (child as usize) > ni && (child as usize) < weak.nodes.len()
                        } else {
                            ((-child) as usize) < weak.leaves.len()
                        };
                        if !ok {
                            return Err(format!("stage {si} classifier {ci} has invalid child {child}"));
                        }
                    }
                }
            }
        }

        for (fi, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(format!("feature {fi} has no rectangles"));
            }
            for r in &feature.rects {
                if r.x < 0
                    || r.y < 0
                    || r.width <= 0
                    || r.height <= 0
                    || r.x + r.width > self.width as i32
                    || r.y + r.height > self.height as i32
                {
                    return Err(format!("feature {fi} rectangle lies outside the window"));
                }
            }
        }

        Ok(())
    }
}

fn handle_element(cascade: &mut HaarCascade, path: &[String], text: &str) -> Result<(), String> {
    let n = path.len();
    if n == 0 {
        return Ok(());
    }
    let name = path[n - 1].as_str();
    let parent = if n >= 2 { path[n - 2].as_str() } else { "" };
    let grandparent = if n >= 3 { path[n - 3].as_str() } else { "" };

    match (grandparent, parent, name) {
        (_, "cascade", "width") => cascade.width = parse_num(text, "width")?,
        (_, "cascade", "height") => cascade.height = parse_num(text, "height")?,
        (_, "cascade", "stageType") if text != "BOOST" => {
            return Err(format!("unsupported stage type {text}"));
        }
        (_, "cascade", "featureType") if text != "HAAR" => {
            return Err(format!("unsupported feature type {text}"));
        }
        ("stages", "_", "stageThreshold") => {
            let stage = cascade.stages.last_mut().ok_or("threshold outside a stage")?;
            stage.threshold = parse_num(text, "stageThreshold")?;
        }
        ("weakClassifiers", "_", "internalNodes") => {
            let values = parse_list(text, "internalNodes")?;
            if values.is_empty() || values.len() % 4 != 0 {
                return Err(format!("internalNodes holds {} values, expected groups of 4", values.len()));
            }
            let weak = last_weak(cascade)?;
            weak.nodes = values
                .chunks(4)
                .map(|v| TreeNode {
                    left: v[0] as i32,
                    right: v[1] as i32,
                    feature: v[2].max(0.0) as usize,
                    threshold: v[3],
                })
                .collect();
        }
        ("weakClassifiers", "_", "leafValues") => {
            last_weak(cascade)?.leaves = parse_list(text, "leafValues")?;
        }
        ("features", "_", "tilted") if text.trim() != "0" => {
            return Err("tilted features are not supported".to_string());
        }
        ("_", "rects", "_") => {
            let v = parse_list(text, "rect")?;
            if v.len() != 5 {
                return Err(format!("rect holds {} values, expected 5", v.len()));
            }
            let feature = cascade.features.last_mut().ok_or("rect outside a feature")?;
            feature.rects.push(HaarRect {
                x: v[0] as i32,
                y: v[1] as i32,
                width: v[2] as i32,
                height: v[3] as i32,
                weight: v[4],
            });
        }
        _ => {}
    }

    Ok(())
}

fn last_weak(cascade: &mut HaarCascade) -> Result<&mut WeakClassifier, String> {
    cascade
        .stages
        .last_mut()
        .and_then(|s| s.classifiers.last_mut())
        .ok_or_else(|| "node data outside a weak classifier".to_string())
}

fn parse_num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {what} value '{text}'"))
}

fn parse_list(text: &str, what: &str) -> Result<Vec<f64>, String> {
    text.split_whitespace().map(|t| parse_num(t, what)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUMP: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade>
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>20</height>
  <width>20</width>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>-0.5</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 1.5e-02</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 20 20 -1.</_>
        <_>
          0 0 20 10 2.</_></rects>
      <tilted>0</tilted></_></features></cascade>
</opencv_storage>
"#;

    #[test]
    fn parses_single_stump_cascade() {
        let cascade = HaarCascade::from_xml(STUMP.as_bytes()).unwrap();
        assert_eq!((cascade.width, cascade.height), (20, 20));
        assert_eq!(cascade.stages.len(), 1);
        assert_eq!(cascade.stages[0].threshold, -0.5);
        let weak = &cascade.stages[0].classifiers[0];
        assert_eq!(
            weak.nodes[0],
            TreeNode { left: 0, right: -1, feature: 0, threshold: 0.015 }
        );
        assert_eq!(weak.leaves, vec![-1.0, 1.0]);
        assert_eq!(cascade.features[0].rects.len(), 2);
        assert_eq!(cascade.features[0].rects[1].weight, 2.0);
    }

    #[test]
    fn rejects_lbp_and_tilted_models() {
        let lbp = STUMP.replace("<featureType>HAAR", "<featureType>LBP");
        assert!(HaarCascade::from_xml(lbp.as_bytes()).unwrap_err().contains("LBP"));

        let tilted = STUMP.replace("<tilted>0", "<tilted>1");
        assert!(HaarCascade::from_xml(tilted.as_bytes()).unwrap_err().contains("tilted"));
    }

    #[test]
    fn rejects_dangling_feature_reference() {
        let broken = STUMP.replace("0 -1 0 1.5e-02", "0 -1 3 1.5e-02");
        assert!(HaarCascade::from_xml(broken.as_bytes()).is_err());
    }

    #[test]
    fn rejects_backward_and_self_referencing_nodes() {
        let looped = STUMP.replace("0 -1 0 1.5e-02", "1 -1 0 1e9 1 -1 0 1e9");
        let err = HaarCascade::from_xml(looped.as_bytes()).unwrap_err();
        assert!(err.contains("invalid child 1"), "{err}");

        let backward = STUMP.replace("0 -1 0 1.5e-02", "1 -1 0 1e9 0 1 0 1e9");
        assert!(HaarCascade::from_xml(backward.as_bytes()).is_err());

        let forward = STUMP.replace("0 -1 0 1.5e-02", "1 -1 0 1e9 0 -1 0 1e9");
        let forward = forward.replace("-1. 1.</leafValues>", "-1. 1. 0.5</leafValues>");
        assert_eq!(HaarCascade::from_xml(forward.as_bytes()).unwrap().stages[0].classifiers[0].nodes.len(), 2);
    }

    #[test]
    fn rejects_non_cascade_documents() {
        assert!(HaarCascade::from_xml(b"not xml at all").is_err());
        assert!(HaarCascade::from_xml(b"<opencv_storage></opencv_storage>").is_err());
    }
}
