/// Number of landmarks in a full-body pose.
pub const LANDMARK_COUNT: usize = 33;

/// Stored coordinates per landmark (`x, y, z`).
pub const LANDMARK_DIMENSIONS: usize = 3;

/// Landmark names in detector output order.
pub const LANDMARK_NAMES: [&str; LANDMARK_COUNT] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky_1",
    "right_pinky_1",
    "left_index_1",
    "right_index_1",
    "left_thumb_2",
    "right_thumb_2",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// Index of a landmark by name.
pub fn landmark_index(name: &str) -> Option<usize> {
    LANDMARK_NAMES.iter().position(|n| *n == name)
}

/// Full-body skeleton: pairs of landmark indices joined when drawing.
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    // face
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    // torso
    (11, 12),
    (11, 23),
    (12, 24),
    (23, 24),
    // left arm and hand
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    // right arm and hand
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    // left leg
    (23, 25),
    (25, 27),
    (27, 29),
    (29, 31),
    (27, 31),
    // right leg
    (24, 26),
    (26, 28),
    (28, 30),
    (30, 32),
    (28, 32),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connections_in_range() {
        for (a, b) in POSE_CONNECTIONS {
            assert!(a < LANDMARK_COUNT && b < LANDMARK_COUNT);
        }
    }

    #[test]
    fn test_landmark_index() {
        assert_eq!(landmark_index("nose"), Some(0));
        assert_eq!(landmark_index("left_hip"), Some(23));
        assert_eq!(landmark_index("right_foot_index"), Some(32));
        assert_eq!(landmark_index("tail"), None);
    }
}
