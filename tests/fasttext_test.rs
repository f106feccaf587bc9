//! Runs against a real `lid.176.bin` when `FASTTEXT_MODEL` points at one.
#![cfg(feature = "fasttext")]

use std::env;

use fasttext_parallel::{load_model, LabelCodes, PredictedLabel, NO_THRESHOLD};

fn model_path() -> Option<String> {
    let path = env::var("FASTTEXT_MODEL").ok();
    if path.is_none() {
        eprintln!("FASTTEXT_MODEL not set, skipping");
    }
    path
}

#[test]
fn test_get_labels() -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = model_path() else { return Ok(()) };
    let classifier = load_model(&path, None)?;
    let labels = classifier.get_labels();
    assert_eq!(labels.len(), 176);
    assert!(labels.index_of("__label__en").is_some());
    assert!(labels.index_of("__label__zh").is_some());
    Ok(())
}

#[test]
fn test_simple() -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = model_path() else { return Ok(()) };
    let codes = LabelCodes::new([("__label__en", 0), ("__label__zh", 1)])?;
    // Every label needs a code, so build the table from the model itself
    let labels = load_model(&path, None)?.get_labels().clone();
    let mut next = 2;
    let all = labels.iter().map(|(_, label)| {
        let code = codes.code_for(label).unwrap_or_else(|| {
            next += 1;
            next - 1
        });
        (label.to_string(), code)
    });
    let classifier = load_model(&path, Some(LabelCodes::new(all.collect::<Vec<_>>())?))?;

    let texts = ["你好", "春天在哪里", "吃了吗", "hello", "how are you"];
    let result = classifier.batch(&texts, 2, NO_THRESHOLD)?;
    assert_eq!(result.len(), texts.len());
    for (i, row) in result.iter().enumerate() {
        let expected = if i < 3 { 1 } else { 0 };
        assert_eq!(row[0].label, PredictedLabel::Code(expected));
        assert!(row[0].prob >= row[1].prob);
    }
    Ok(())
}
