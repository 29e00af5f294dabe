//! Built-in lesson and song catalog
//!
//! Inserted by [`crate::db::seed_catalog`] the first time the database is
//! created. Lesson ids are assigned in table order starting at 1.

/// Static lesson row: (course, module, title, sequence index, is_final, is_bonus)
pub struct SeedLesson {
    pub course: i64,
    pub module: &'static str,
    pub title: &'static str,
    pub order_index: i64,
    pub is_final: bool,
    pub is_bonus: bool,
}

const fn lesson(course: i64, module: &'static str, title: &'static str, order_index: i64) -> SeedLesson {
    SeedLesson {
        course,
        module,
        title,
        order_index,
        is_final: false,
        is_bonus: false,
    }
}

const fn final_lesson(course: i64, module: &'static str, title: &'static str, order_index: i64) -> SeedLesson {
    SeedLesson {
        course,
        module,
        title,
        order_index,
        is_final: true,
        is_bonus: false,
    }
}

const fn bonus_lesson(course: i64, module: &'static str, title: &'static str, order_index: i64) -> SeedLesson {
    SeedLesson {
        course,
        module,
        title,
        order_index,
        is_final: false,
        is_bonus: true,
    }
}

/// Course 1: fingerstyle foundations (20 lessons)
/// Course 2: percussion and complex beats (17 lessons)
/// Course 3: advanced techniques (18 lessons, 4 bonus)
pub const LESSONS: &[SeedLesson] = &[
    lesson(1, "Intro module", "Lesson 1. Introduction. What is fingerstyle?", 0),
    lesson(1, "Intro module", "Lesson 2. Right hand position", 1),
    lesson(1, "Intro module", "Lesson 3. Left hand position", 2),
    lesson(1, "Module 1", "Lesson 4. Reading tabs properly", 3),
    lesson(1, "Module 1", "Lesson 5. Note durations and the metronome", 4),
    lesson(1, "Module 1", "Lesson 6. Thumb and bass", 5),
    lesson(1, "Module 2", "Lesson 7. Two voices", 6),
    lesson(1, "Module 2", "Lesson 8. Dotted quarter", 7),
    lesson(1, "Module 2", "Lesson 9. Melody plus chord", 8),
    lesson(1, "Module 2", "Lesson 10. Joining melody, bass and accompaniment. Syncopation", 9),
    lesson(1, "Module 2", "Lesson 11. Syncopation inside the bar", 10),
    lesson(1, "Module 2", "Lesson 12. Three voices, repeat signs in tabs", 11),
    lesson(1, "Module 3", "Lesson 13. Sixteenths", 12),
    lesson(1, "Module 3", "Lesson 14. Dotted rhythms", 13),
    lesson(1, "Module 3", "Lesson 15. Triplets", 14),
    lesson(1, "Module 4", "Lesson 16. Left hand technique. Hammer-on/Pull-off", 15),
    lesson(1, "Module 4", "Lesson 17. Natural harmonics", 16),
    lesson(1, "Module 4", "Lesson 18. Artificial harmonics", 17),
    lesson(1, "Module 4", "Lesson 19. Ornaments: grace note, slide, arpeggiato", 18),
    final_lesson(1, "Module 4", "Lesson 20. Graduation piece", 19),
    lesson(2, "Module 1", "Lesson 1. What is percussion?", 0),
    lesson(2, "Module 1", "Lesson 2. Slap across all strings", 1),
    lesson(2, "Module 1", "Lesson 3. Bass + Snare", 2),
    lesson(2, "Module 1", "Lesson 4. Melody + Snare", 3),
    lesson(2, "Module 1", "Lesson 5. Flick across several strings", 4),
    lesson(2, "Module 1", "Lesson 6. Flick on a single string. Left hand muting during the flick", 5),
    lesson(2, "Module 1", "Lesson 7. Pieces built on the flick", 6),
    lesson(2, "Module 2", "Lesson 8. Bass drum (Kick)", 7),
    lesson(2, "Module 2", "Lesson 9. Bass + Kick", 8),
    lesson(2, "Module 2", "Lesson 10. Double Kick", 9),
    lesson(2, "Module 2", "Lesson 11. Melody + Kick", 10),
    lesson(2, "Module 2", "Lesson 12. Chord + Kick", 11),
    lesson(2, "Module 2", "Lesson 13. Putting it together (Kick + Snare)", 12),
    lesson(2, "Module 3", "Lesson 14. Broken kick, shifted kick", 13),
    lesson(2, "Module 3", "Lesson 15. Complex beats. Writing beats", 14),
    lesson(2, "Module 3", "Lesson 16. Pre-Chorus 'Numb'", 15),
    final_lesson(2, "Module 3", "Lesson 17. Graduation piece 'Numb': Intro, Verse, Pre-Chorus, Chorus", 16),
    lesson(3, "Module 1", "Lesson 1. Palm snare", 0),
    lesson(3, "Module 1", "Lesson 2. Palm snare. Practice", 1),
    lesson(3, "Module 1", "Lesson 3. Slap snare and body snare", 2),
    lesson(3, "Module 1", "Lesson 4. Three kinds of hi-hats in eighths", 3),
    lesson(3, "Module 1", "Lesson 5. Two kinds of hi-hats in sixteenths", 4),
    lesson(3, "Module 2", "Lesson 6. Thumb slap across several strings", 5),
    lesson(3, "Module 2", "Lesson 7. Slap + kick", 6),
    lesson(3, "Module 2", "Lesson 8. Slap on a single string", 7),
    lesson(3, "Module 2", "Lesson 9. Percussive (slap) harmonics", 8),
    lesson(3, "Module 3", "Lesson 10. Palm mute + funk bass", 9),
    lesson(3, "Module 3", "Lesson 11. Body percussion", 10),
    lesson(3, "Module 3", "Lesson 12. Rasgueado", 11),
    lesson(3, "Module 3", "Lesson 13. Hand independence", 12),
    final_lesson(3, "Module 3", "Lesson 14. Two-hand tapping", 13),
    bonus_lesson(3, "Bonus module", "Lesson 15. Rasgueado across strings", 14),
    bonus_lesson(3, "Bonus module", "Lesson 16. Marcin fill", 15),
    bonus_lesson(3, "Bonus module", "Lesson 17. Full arrangement: Marcin 'Kashmir'", 16),
    bonus_lesson(3, "Bonus module", "Lesson 18. Full arrangement: Jinsan Kim 'Crow'", 17),
];

/// Song breakdowns, keyed by the number shown in the selection grid
pub const SONGS: &[(i64, &str)] = &[
    (1, "Billie Jean"),
    (2, "Seventh Petal"),
    (3, "Another Love"),
    (4, "Crow"),
    (5, "One of Us"),
    (6, "Game of Thrones"),
    (7, "Stay"),
    (8, "Get Lucky"),
    (9, "Zombie"),
    (10, "Kashmir"),
    (11, "Beggin'"),
    (12, "We Don't Talk Anymore"),
    (13, "Changes"),
    (14, "Take Me to Church"),
    (15, "Numb"),
    (16, "The Weeknd"),
    (17, "Feel Good"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_sizes() {
        let count = |course| LESSONS.iter().filter(|l| l.course == course).count();
        assert_eq!(count(1), 20);
        assert_eq!(count(2), 17);
        assert_eq!(count(3), 18);
    }

    #[test]
    fn test_sequence_indexes_are_dense_per_course() {
        for course in 1..=3 {
            let mut indexes: Vec<i64> = LESSONS
                .iter()
                .filter(|l| l.course == course)
                .map(|l| l.order_index)
                .collect();
            indexes.sort_unstable();
            let expected: Vec<i64> = (0..indexes.len() as i64).collect();
            assert_eq!(indexes, expected, "course {} has gaps", course);
        }
    }

    #[test]
    fn test_one_final_lesson_per_course() {
        for course in 1..=3 {
            let finals = LESSONS
                .iter()
                .filter(|l| l.course == course && l.is_final)
                .count();
            assert_eq!(finals, 1);
        }
    }

    #[test]
    fn test_song_ids_unique() {
        let mut ids: Vec<i64> = SONGS.iter().map(|(id, _)| *id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 17);
    }
}
