//! Synthetic labelled feature vectors for offline model training.
//!
//! Benign sequences are slow create/modify activity; malicious sequences are
//! rapid modify/rename/delete bursts. Each sequence is windowed with
//! [`extract_features`] and every window inherits the sequence label.

use std::io::Write;

use anyhow::Result;
use rand::Rng;
use serde::Serialize;

use super::features::{extract_features, FeatureVector};
use crate::event::{Event, EventKind};

const BENIGN_KINDS: &[EventKind] = &[EventKind::Created, EventKind::Modified];
const MALICIOUS_KINDS: &[EventKind] = &[EventKind::Modified, EventKind::Renamed, EventKind::Deleted];

#[derive(Debug, Clone)]
pub struct DatasetSpec {
    /// Sequences generated per class.
    pub sequences: usize,
    pub events_per_sequence: usize,
    pub window_seconds: f64,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            sequences: 200,
            events_per_sequence: 50,
            window_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabeledSample {
    pub features: [f64; FeatureVector::LEN],
    /// 0 = benign, 1 = malicious.
    pub label: u8,
}

fn sequence<R: Rng>(
    rng: &mut R,
    len: usize,
    kinds: &[EventKind],
    gap: std::ops::Range<f64>,
) -> Vec<Event> {
    let mut ts = 0.0;
    (0..len)
        .map(|_| {
            ts += rng.gen_range(gap.clone());
            let kind = kinds[rng.gen_range(0..kinds.len())];
            Event::new(ts, kind, "sample")
        })
        .collect()
}

/// Generate benign samples first, then malicious ones.
pub fn generate<R: Rng>(spec: &DatasetSpec, rng: &mut R) -> Vec<LabeledSample> {
    let mut samples = Vec::new();

    for (label, kinds, gap) in [
        (0u8, BENIGN_KINDS, 0.5..2.0),
        (1u8, MALICIOUS_KINDS, 0.05..0.3),
    ] {
        for _ in 0..spec.sequences {
            let events = sequence(rng, spec.events_per_sequence, kinds, gap.clone());
            samples.extend(
                extract_features(&events, spec.window_seconds)
                    .into_iter()
                    .map(|f| LabeledSample {
                        features: f.to_array(),
                        label,
                    }),
            );
        }
    }

    samples
}

/// One JSON object per line.
pub fn write_jsonl<W: Write>(samples: &[LabeledSample], mut out: W) -> Result<()> {
    for s in samples {
        serde_json::to_writer(&mut out, s)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_labels_both_classes() {
        let spec = DatasetSpec {
            sequences: 5,
            events_per_sequence: 50,
            window_seconds: 10.0,
        };
        let samples = generate(&spec, &mut StdRng::seed_from_u64(9));
        let benign: Vec<_> = samples.iter().filter(|s| s.label == 0).collect();
        let malicious: Vec<_> = samples.iter().filter(|s| s.label == 1).collect();

        // 50 benign events span 25..100s, so at least 3 windows each.
        assert!(benign.len() >= 15);
        // 50 malicious events span 2.5..15s.
        assert!(malicious.len() >= 5);

        assert!(benign.iter().all(|s| s.features[1] == 0.0));
        let mean_burst = |xs: &[&LabeledSample]| {
            xs.iter().map(|s| s.features[4]).sum::<f64>() / xs.len() as f64
        };
        assert!(mean_burst(&malicious) > mean_burst(&benign));
    }

    #[test]
    fn test_generation_is_seeded() {
        let spec = DatasetSpec {
            sequences: 2,
            ..DatasetSpec::default()
        };
        let a = generate(&spec, &mut StdRng::seed_from_u64(1));
        let b = generate(&spec, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.len(), b.len());
        assert!(a.iter().zip(&b).all(|(x, y)| x.features == y.features && x.label == y.label));
    }

    #[test]
    fn test_write_jsonl() {
        let samples = vec![
            LabeledSample {
                features: [1.0, 0.0, 0.0, 0.0, 0.1],
                label: 0,
            },
            LabeledSample {
                features: [3.0, 2.0, 0.5, 1.5, 2.0],
                label: 1,
            },
        ];
        let mut buf = Vec::new();
        write_jsonl(&samples, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["label"], 1);
        assert_eq!(parsed["features"][2], 0.5);
    }
}
