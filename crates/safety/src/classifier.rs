use cloud::ClassLabel;

/// Label with the highest score; ties keep the first
pub fn top_label(labels: &[ClassLabel]) -> Option<&ClassLabel> {
    labels
        .iter()
        .reduce(|best, label| if label.score > best.score { label } else { best })
}

/// Names of the labels, in response order
pub fn label_names(labels: &[ClassLabel]) -> Vec<&str> {
    labels.iter().map(|l| l.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, score: f64) -> ClassLabel {
        ClassLabel {
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_top_label() {
        let labels = vec![
            label("Cardiology", 0.2),
            label("Oncology", 0.7),
            label("Neurology", 0.1),
        ];
        assert_eq!(top_label(&labels).unwrap().name, "Oncology");
    }

    #[test]
    fn test_tie_keeps_first() {
        let labels = vec![label("A", 0.5), label("B", 0.5)];
        assert_eq!(top_label(&labels).unwrap().name, "A");
    }

    #[test]
    fn test_empty() {
        assert!(top_label(&[]).is_none());
    }
}
