//! Built-in subject catalog used for first launch and resets.

use std::sync::Arc;

use crate::model::{Chapter, ChapterId, Column, ColumnId, DEFAULT_COLUMNS, Subject, SubjectId};

pub const PHYSICS_CHAPTERS: [&str; 30] = [
    "Physics and Measurements",
    "Kinematics",
    "Laws of Motion",
    "Work Energy and Power",
    "Rotational Motion",
    "Gravitation",
    "Properties of Solids and Liquids",
    "Thermodynamics",
    "Kinetic Theory of Gases",
    "Oscillations and Waves",
    "Electrostatics",
    "Current Electricity",
    "Magnetic Effects of Current and Magnetism",
    "Electromagnetic Induction and Alternating Currents",
    "Electromagnetic Waves",
    "Ray Optics and Optical Instruments",
    "Wave Optics",
    "Dual Nature of Matter and Radiation",
    "Atoms",
    "Nuclei",
    "Semiconductor Electronics",
    "Communication Systems",
    "Experimental Skills",
    "Error Analysis",
    "Modern Physics Applications",
    "Fluid Mechanics",
    "Thermal Properties of Matter",
    "Simple Harmonic Motion",
    "System of Particles and Centre of Mass",
    "Mechanical Properties of Materials",
];

pub const CHEMISTRY_CHAPTERS: [&str; 30] = [
    "Some Basic Concepts of Chemistry",
    "Atomic Structure",
    "Chemical Bonding and Molecular Structure",
    "Chemical Thermodynamics",
    "Solutions",
    "Equilibrium",
    "Redox Reactions and Electrochemistry",
    "Chemical Kinetics",
    "Surface Chemistry",
    "Classification of Elements and Periodicity",
    "Hydrogen",
    "s-Block Elements",
    "p-Block Elements",
    "d and f-Block Elements",
    "Coordination Compounds",
    "Environmental Chemistry",
    "Purification and Characterization of Organic Compounds",
    "Basic Principles of Organic Chemistry",
    "Hydrocarbons",
    "Organic Compounds Containing Halogens",
    "Organic Compounds Containing Oxygen",
    "Organic Compounds Containing Nitrogen",
    "Biomolecules",
    "Polymers",
    "Chemistry in Everyday Life",
    "Solid State",
    "Solutions and Colligative Properties",
    "Aldehydes Ketones and Carboxylic Acids",
    "Amines",
    "Practical Organic Chemistry",
];

pub const MATHEMATICS_CHAPTERS: [&str; 30] = [
    "Sets Relations and Functions",
    "Complex Numbers and Quadratic Equations",
    "Matrices and Determinants",
    "Permutations and Combinations",
    "Mathematical Induction",
    "Binomial Theorem",
    "Sequences and Series",
    "Limit Continuity and Differentiability",
    "Application of Derivatives",
    "Indefinite Integration",
    "Definite Integration",
    "Area Under Curves",
    "Differential Equations",
    "Straight Lines",
    "Circles",
    "Parabola",
    "Ellipse",
    "Hyperbola",
    "Three Dimensional Geometry",
    "Vector Algebra",
    "Statistics",
    "Probability",
    "Trigonometry",
    "Inverse Trigonometric Functions",
    "Trigonometric Equations",
    "Heights and Distances",
    "Mathematical Reasoning",
    "Linear Programming",
    "Coordinate Geometry",
    "Conic Sections",
];

pub const DEFAULT_SUBJECTS: [(&str, &[&str]); 3] = [
    ("Physics", &PHYSICS_CHAPTERS),
    ("Chemistry", &CHEMISTRY_CHAPTERS),
    ("Mathematics", &MATHEMATICS_CHAPTERS),
];

/// The default column pair with freshly minted ids.
#[must_use]
pub fn default_columns() -> Vec<Column> {
    DEFAULT_COLUMNS
        .iter()
        .enumerate()
        .map(|(order, preset)| Column::new(ColumnId::generate(), preset.name, preset.kind, order))
        .collect()
}

/// Builds the default catalog; every checkball starts empty.
#[must_use]
pub fn default_subjects() -> Vec<Arc<Subject>> {
    DEFAULT_SUBJECTS
        .iter()
        .enumerate()
        .map(|(order, (name, chapter_names))| {
            let columns = default_columns();
            let chapters = chapter_names
                .iter()
                .enumerate()
                .map(|(idx, chapter)| {
                    Chapter::seeded(
                        ChapterId::generate(),
                        *chapter,
                        idx,
                        columns.iter().map(|c| &c.id),
                    )
                })
                .collect();
            Arc::new(Subject {
                id: SubjectId::generate(),
                name: (*name).to_owned(),
                order,
                columns,
                chapters,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_aligned_and_empty() {
        let subjects = default_subjects();
        let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Physics", "Chemistry", "Mathematics"]);
        for (idx, subject) in subjects.iter().enumerate() {
            assert_eq!(subject.order, idx);
            assert_eq!(subject.columns.len(), 2);
            assert_eq!(subject.chapters.len(), 30);
            assert!(subject.checkballs_aligned());
            assert!(
                subject
                    .chapters
                    .iter()
                    .flat_map(|c| c.checkballs.iter())
                    .all(|cb| cb.level.value() == 0)
            );
        }
    }

    #[test]
    fn subjects_do_not_share_column_ids() {
        let subjects = default_subjects();
        assert_ne!(subjects[0].columns[0].id, subjects[1].columns[0].id);
    }
}
