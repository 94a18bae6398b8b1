use serde::{Deserialize, Serialize};

/// Closed enumeration of supported exercises.
///
/// Selects which rule set the posture engine applies. Immutable for one
/// analysis cycle but may change between cycles when the user switches
/// exercises mid-session; the rule engine is stateless so this is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseType {
    Squat,
    Deadlift,
    Pushup,
    Plank,
    Lunge,
    BenchPress,
    ShoulderPress,
    BicepCurl,
    YogaWarrior,
    YogaDowndog,
    YogaTree,
    YogaChair,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 12] = [
        ExerciseType::Squat,
        ExerciseType::Deadlift,
        ExerciseType::Pushup,
        ExerciseType::Plank,
        ExerciseType::Lunge,
        ExerciseType::BenchPress,
        ExerciseType::ShoulderPress,
        ExerciseType::BicepCurl,
        ExerciseType::YogaWarrior,
        ExerciseType::YogaDowndog,
        ExerciseType::YogaTree,
        ExerciseType::YogaChair,
    ];

    /// Library entry for this exercise (display name, coaching notes).
    pub fn info(&self) -> &'static ExerciseInfo {
        &EXERCISE_LIBRARY[*self as usize]
    }
}

impl std::str::FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown exercise type: {}", s))
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.info().name)
    }
}

/// Static library entry describing one exercise for UI and coaching text.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub target_muscles: &'static [&'static str],
    pub common_errors: &'static [&'static str],
    pub tips: &'static [&'static str],
}

/// One entry per `ExerciseType`, indexed by discriminant order.
static EXERCISE_LIBRARY: [ExerciseInfo; 12] = [
    ExerciseInfo {
        name: "Barbell Squat",
        description: "A compound exercise that targets primarily the quadriceps, hamstrings, and glutes.",
        target_muscles: &["Quadriceps", "Hamstrings", "Glutes", "Core"],
        common_errors: &[
            "Knees caving inward",
            "Heels lifting off the ground",
            "Insufficient depth",
            "Forward lean",
        ],
        tips: &[
            "Keep your chest up",
            "Push your knees outward",
            "Descend until thighs are parallel to the ground",
            "Keep your weight in your heels",
        ],
    },
    ExerciseInfo {
        name: "Deadlift",
        description: "A compound exercise that works most major muscle groups, with emphasis on the posterior chain.",
        target_muscles: &["Hamstrings", "Glutes", "Lower Back", "Trapezius", "Forearms"],
        common_errors: &[
            "Rounding the back",
            "Starting with the bar too far from shins",
            "Jerking the weight off the floor",
            "Insufficient hip extension",
        ],
        tips: &[
            "Keep the bar close to your body",
            "Engage your lats before lifting",
            "Push through your heels",
        ],
    },
    ExerciseInfo {
        name: "Push-Up",
        description: "A bodyweight exercise that targets the chest, shoulders, and triceps.",
        target_muscles: &["Chest", "Shoulders", "Triceps", "Core"],
        common_errors: &[
            "Sagging hips",
            "Flared elbows",
            "Incomplete range of motion",
            "Head dropping forward",
        ],
        tips: &[
            "Keep your body in a straight line from head to heels",
            "Position elbows at about 45 degrees to your body",
            "Engage your core throughout the movement",
        ],
    },
    ExerciseInfo {
        name: "Plank",
        description: "An isometric core exercise that also engages the shoulders, arms, and glutes.",
        target_muscles: &["Core", "Shoulders", "Arms", "Glutes"],
        common_errors: &[
            "Sagging hips",
            "Raised buttocks",
            "Shoulders hunched around ears",
        ],
        tips: &[
            "Keep your body in a straight line",
            "Engage your core by drawing your navel toward your spine",
            "Look at a spot on the floor to keep your neck neutral",
        ],
    },
    ExerciseInfo {
        name: "Lunge",
        description: "A unilateral exercise that targets the quadriceps, hamstrings, and glutes while improving balance.",
        target_muscles: &["Quadriceps", "Hamstrings", "Glutes", "Core"],
        common_errors: &[
            "Front knee extending past the toes",
            "Torso leaning too far forward",
            "Uneven weight distribution",
        ],
        tips: &[
            "Keep your torso upright",
            "Lower your back knee toward the floor",
            "Push through your front heel when rising",
        ],
    },
    ExerciseInfo {
        name: "Bench Press",
        description: "A compound upper body exercise that targets the chest, shoulders, and triceps.",
        target_muscles: &["Chest", "Shoulders", "Triceps"],
        common_errors: &[
            "Arching the back excessively",
            "Bouncing the bar off the chest",
            "Uneven bar path",
        ],
        tips: &[
            "Keep your feet flat on the floor",
            "Lower the bar to your mid-chest",
            "Keep your wrists straight throughout the movement",
        ],
    },
    ExerciseInfo {
        name: "Shoulder Press",
        description: "An upper body strength exercise that targets the shoulders, triceps, and upper chest.",
        target_muscles: &["Shoulders", "Triceps", "Upper Chest", "Core"],
        common_errors: &[
            "Arching the lower back",
            "Flaring the elbows too wide",
            "Leaning back excessively",
        ],
        tips: &[
            "Keep your core tight to protect your lower back",
            "Press the weight directly overhead",
        ],
    },
    ExerciseInfo {
        name: "Bicep Curl",
        description: "An isolation exercise that targets the biceps brachii muscles in the front of the upper arm.",
        target_muscles: &["Biceps", "Forearms"],
        common_errors: &[
            "Using momentum (swinging)",
            "Moving the elbows forward",
            "Incomplete range of motion",
        ],
        tips: &[
            "Keep your elbows fixed at your sides",
            "Squeeze your biceps at the top",
            "Control the weight on the way down",
        ],
    },
    ExerciseInfo {
        name: "Warrior Pose",
        description: "A fundamental standing yoga pose that strengthens the legs and core while improving balance.",
        target_muscles: &["Quadriceps", "Hamstrings", "Core", "Shoulders"],
        common_errors: &[
            "Front knee not aligned with ankle",
            "Hips not square to the side",
            "Shoulders tensed up",
        ],
        tips: &[
            "Keep your front knee directly above your ankle",
            "Square your hips toward the side of your mat",
            "Relax your shoulders down away from your ears",
        ],
    },
    ExerciseInfo {
        name: "Downward-Facing Dog",
        description: "A restorative yoga pose that stretches the hamstrings, calves, and shoulders.",
        target_muscles: &["Hamstrings", "Calves", "Shoulders", "Arms", "Core"],
        common_errors: &[
            "Rounding the upper back",
            "Heels lifted too high",
            "Shoulders hunched",
        ],
        tips: &[
            "Create an inverted V-shape with your body",
            "Press your heels toward the floor",
            "Draw your shoulder blades down your back",
        ],
    },
    ExerciseInfo {
        name: "Tree Pose",
        description: "A balancing yoga pose that improves focus and stability while strengthening the legs and core.",
        target_muscles: &["Legs", "Core", "Ankles"],
        common_errors: &[
            "Pressing foot against the knee joint",
            "Leaning to one side",
            "Holding breath",
        ],
        tips: &[
            "Press your foot into your inner thigh, not your knee",
            "Keep your standing leg straight but not locked",
            "Focus your gaze on a fixed point to maintain balance",
        ],
    },
    ExerciseInfo {
        name: "Chair Pose",
        description: "A standing yoga pose that strengthens the thighs, glutes, and core while improving posture.",
        target_muscles: &["Quadriceps", "Glutes", "Core", "Lower Back"],
        common_errors: &[
            "Knees extending past toes",
            "Shoulders hunching forward",
            "Weight in the toes",
        ],
        tips: &[
            "Sit back as if lowering into an imaginary chair",
            "Keep your weight in your heels",
            "Keep your knees aligned with your second and third toes",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_camel_case() {
        let json = serde_json::to_string(&ExerciseType::BenchPress).unwrap();
        assert_eq!(json, "\"benchPress\"");
        let t: ExerciseType = serde_json::from_str("\"yogaDowndog\"").unwrap();
        assert_eq!(t, ExerciseType::YogaDowndog);
    }

    #[test]
    fn test_from_str_round_trip() {
        for t in ExerciseType::ALL {
            let wire = serde_json::to_value(t).unwrap();
            let s = wire.as_str().unwrap();
            assert_eq!(s.parse::<ExerciseType>().unwrap(), t);
        }
        assert!("handstand".parse::<ExerciseType>().is_err());
    }

    #[test]
    fn test_every_exercise_has_library_entry() {
        for t in ExerciseType::ALL {
            let info = t.info();
            assert!(!info.name.is_empty());
            assert!(!info.common_errors.is_empty());
            assert!(!info.tips.is_empty());
        }
        assert_eq!(ExerciseType::Squat.info().name, "Barbell Squat");
        assert_eq!(ExerciseType::YogaChair.info().name, "Chair Pose");
    }
}
