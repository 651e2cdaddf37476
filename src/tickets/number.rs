//! Numéros de ticket présentés aux humains : `#` suivi de 5 chiffres.

/// Marqueur placé devant chaque numéro
pub const MARKER: char = '#';

/// Formate une valeur de la séquence en numéro de ticket.
pub fn format(sequence: i64) -> String {
    format!("{}{:05}", MARKER, sequence)
}

/// Normalise une référence saisie par un humain.
///
/// Le marqueur est ajouté s'il est absent ; la recherche reste ensuite une
/// égalité stricte, `7` ne correspond donc pas à `#00007`.
pub fn normalize(reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with(MARKER) {
        reference.to_string()
    } else {
        format!("{}{}", MARKER, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_padded() {
        assert_eq!(format(1), "#00001");
        assert_eq!(format(42), "#00042");
        assert_eq!(format(123456), "#123456");
    }

    #[test]
    fn marker_is_added_once() {
        assert_eq!(normalize("00001"), "#00001");
        assert_eq!(normalize("#00001"), "#00001");
        assert_eq!(normalize("  00012 "), "#00012");
        assert_eq!(normalize("7"), "#7");
    }
}
