use crate::{classification::Species, error::ModelLoadError};
use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

pub fn load_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    parse_labels(io::BufReader::new(file))
}

/// One label per line, in model output order. Blank lines are skipped.
pub fn parse_labels<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "labels file contains no labels",
        ));
    }

    Ok(labels)
}

pub fn check_gate_labels(labels: &[String], pet_label: &str) -> Result<(), ModelLoadError> {
    if labels.iter().any(|label| label == pet_label) {
        Ok(())
    } else {
        Err(ModelLoadError::MissingPetLabel(pet_label.to_string()))
    }
}

pub fn check_species_labels(labels: &[String]) -> Result<(), ModelLoadError> {
    match labels.iter().find(|label| label.parse::<Species>().is_err()) {
        Some(unknown) => Err(ModelLoadError::UnknownSpecies(unknown.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_labels_skips_blank_lines() {
        let labels = parse_labels(Cursor::new("cat\n\n dog \nhamster\r\nparrot\n")).unwrap();
        assert_eq!(labels, vec!["cat", "dog", "hamster", "parrot"]);
    }

    #[test]
    fn test_parse_labels_rejects_empty_file() {
        let err = parse_labels(Cursor::new("\n  \n")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_load_labels_missing_file() {
        let err = load_labels(Path::new("./does/not/exist.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_check_gate_labels() {
        let labels = vec!["not_pets".to_string(), "pets".to_string()];
        assert!(check_gate_labels(&labels, "pets").is_ok());
        assert!(matches!(
            check_gate_labels(&labels, "animals"),
            Err(ModelLoadError::MissingPetLabel(label)) if label == "animals"
        ));
    }

    #[test]
    fn test_check_species_labels() {
        let known = vec!["dog".to_string(), "Cat".to_string()];
        assert!(check_species_labels(&known).is_ok());

        let unknown = vec!["dog".to_string(), "iguana".to_string()];
        assert!(matches!(
            check_species_labels(&unknown),
            Err(ModelLoadError::UnknownSpecies(label)) if label == "iguana"
        ));
    }
}
