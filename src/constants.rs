//! Constants used throughout the application

/// Consecutive face-in-guide frames required to unlock the kiosk
pub const DEFAULT_FACE_UNLOCK_FRAMES: u32 = 30;

/// Side of the square guide region as a fraction of the frame height
pub const DEFAULT_GUIDE_BOX_RATIO: f32 = 0.6;

/// Consecutive qualifying observations required to confirm a gesture
pub const DEFAULT_GESTURE_CONFIRM_FRAMES: u32 = 5;

/// Observations below this confidence are treated as idle
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.85;

/// Pointer positions above this normalized y are discarded (0.0 is the top edge)
pub const DEFAULT_UPPER_REGION_CUTOFF: f32 = 0.1;

/// Seconds the result screen stays up before the kiosk returns to the face guide
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 5;

/// Multiplier applied to the result timeout after an account was created
pub const ACCOUNT_CREATED_TIMEOUT_FACTOR: u32 = 2;

/// Pointing-position thresholds (normalized x)
pub const DEFAULT_LEFT_THRESHOLD: f32 = 1.0 / 3.0;
pub const DEFAULT_RIGHT_THRESHOLD: f32 = 2.0 / 3.0;
pub const DEFAULT_EDGE_MARGIN: f32 = 0.05;

/// Minimum keypoint score for a wrist or elbow to be trusted
pub const DEFAULT_KEYPOINT_MIN_CONFIDENCE: f32 = 0.3;

/// Fingertip extrapolation factor along the elbow→wrist vector
pub const FINGERTIP_EXTRAPOLATION: f32 = 0.8;

/// COCO keypoint indices used for pointing
pub const KP_LEFT_ELBOW: usize = 7;
pub const KP_RIGHT_ELBOW: usize = 8;
pub const KP_LEFT_WRIST: usize = 9;
pub const KP_RIGHT_WRIST: usize = 10;

/// Number of COCO body keypoints produced by the pose model
pub const NUM_POSE_KEYPOINTS: usize = 17;

/// Presence monitor defaults
pub const DEFAULT_ABSENCE_FRAMES: u32 = 45;
pub const DEFAULT_GRACE_PERIOD_FRAMES: u32 = 90;
pub const PRESENCE_HISTORY_WINDOW: usize = 60;
pub const INTERMITTENT_DETECTION_RATE: f32 = 0.2;
pub const INTERMITTENT_MIN_RUN: usize = 5;

/// A face smaller than this fraction of the usual face area counts as absent
pub const ABSENT_AREA_RATIO: f32 = 0.4;
/// Faces within this relative band of the usual area update it
pub const NORMAL_AREA_BAND: f32 = 0.15;
/// Smoothing factor of the usual-face-area moving average
pub const NORMAL_AREA_ALPHA: f32 = 0.05;

/// Seconds the absence warning waits for an answer before falling back to the menu
pub const DEFAULT_ABSENCE_WARNING_SECONDS: u64 = 10;

/// Entry field lengths
pub const PIN_LENGTH: usize = 4;
pub const ACCOUNT_NUMBER_LENGTH: usize = 6;
pub const AMOUNT_MAX_DIGITS: usize = 7;
pub const HOLDER_NAME_MAX_CHARS: usize = 10;

/// Ledger defaults
pub const DEFAULT_MAX_AMOUNT: u64 = 999_999;
pub const DEFAULT_MAX_PIN_ATTEMPTS: u32 = 3;
pub const DEFAULT_PIN_SALT: &str = "default_salt";
pub const NEW_ACCOUNT_OPENING_BALANCE: u64 = 1_000;

/// Demo account seeded into an empty ledger
pub const DEMO_ACCOUNT_NUMBER: &str = "123456";
pub const DEMO_ACCOUNT_HOLDER: &str = "DEMO TARO";
pub const DEMO_ACCOUNT_PIN: &str = "1234";
pub const DEMO_ACCOUNT_BALANCE: u64 = 1_000_000;

/// Default frames per second for the tick loop
pub const DEFAULT_FPS: u32 = 30;
