//! Static tables behind authority matching: what each role handles and how
//! effective it is, how strong a relation is, and which words trigger which
//! themes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityRole {
    MentalHealthProfessional,
    ReligiousLeader,
    Parent,
    Teacher,
    LawEnforcement,
    PeerCounselor,
    Coach,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    pub handles: &'static [&'static str],
    pub effectiveness: f64,
}

/// Profile for roles outside the taxonomy.
pub const UNKNOWN_ROLE: RoleProfile = RoleProfile {
    handles: &[],
    effectiveness: 0.5,
};

impl AuthorityRole {
    pub const ALL: [AuthorityRole; 7] = [
        AuthorityRole::MentalHealthProfessional,
        AuthorityRole::ReligiousLeader,
        AuthorityRole::Parent,
        AuthorityRole::Teacher,
        AuthorityRole::LawEnforcement,
        AuthorityRole::PeerCounselor,
        AuthorityRole::Coach,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AuthorityRole::MentalHealthProfessional => "Mental Health Professional",
            AuthorityRole::ReligiousLeader => "Religious Leader",
            AuthorityRole::Parent => "Parent",
            AuthorityRole::Teacher => "Teacher",
            AuthorityRole::LawEnforcement => "Law Enforcement",
            AuthorityRole::PeerCounselor => "Peer Counselor",
            AuthorityRole::Coach => "Coach",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.label().eq_ignore_ascii_case(label))
    }

    pub fn profile(&self) -> RoleProfile {
        match self {
            AuthorityRole::MentalHealthProfessional => RoleProfile {
                handles: &["incel", "depression", "isolation", "self-harm", "blackpill", "hopelessness"],
                effectiveness: 0.9,
            },
            AuthorityRole::ReligiousLeader => RoleProfile {
                handles: &["nihilism", "purpose", "meaning", "morality"],
                effectiveness: 0.7,
            },
            AuthorityRole::Parent => RoleProfile {
                handles: &["general", "support", "boundaries", "early-stage"],
                effectiveness: 0.8,
            },
            AuthorityRole::Teacher => RoleProfile {
                handles: &["conspiracy", "misinformation", "critical-thinking", "education"],
                effectiveness: 0.6,
            },
            AuthorityRole::LawEnforcement => RoleProfile {
                handles: &["violence", "extremism", "accelerationism", "threats", "weapons"],
                effectiveness: 0.85,
            },
            AuthorityRole::PeerCounselor => RoleProfile {
                handles: &["loneliness", "social-anxiety", "relatability", "connection"],
                effectiveness: 0.65,
            },
            AuthorityRole::Coach => RoleProfile {
                handles: &["motivation", "discipline", "self-improvement", "masculinity"],
                effectiveness: 0.7,
            },
        }
    }
}

/// Profile for a stored role name; unknown roles get [`UNKNOWN_ROLE`].
pub fn profile_for(role: &str) -> RoleProfile {
    AuthorityRole::from_label(role)
        .map(|r| r.profile())
        .unwrap_or(UNKNOWN_ROLE)
}

const RELATION_WEIGHTS: &[(&str, f64)] = &[
    ("parent", 0.9),
    ("guardian", 0.85),
    ("therapist", 0.8),
    ("mentor", 0.7),
    ("teacher", 0.6),
    ("coach", 0.65),
    ("friend", 0.75),
    ("religious guide", 0.7),
    ("counselor", 0.75),
];

pub const DEFAULT_RELATIONSHIP_STRENGTH: f64 = 0.5;

/// Relationship weight for a free-text relation, case-insensitive.
pub fn relationship_strength(relation: &str) -> f64 {
    let relation = relation.trim().to_lowercase();
    RELATION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == relation)
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_RELATIONSHIP_STRENGTH)
}

pub struct ThemeBucket {
    pub triggers: &'static [&'static str],
    pub themes: &'static [&'static str],
}

pub const GENERAL_THEME: &str = "general";

pub const THEME_BUCKETS: &[ThemeBucket] = &[
    ThemeBucket {
        triggers: &["blackpill", "chad", "stacy", "incel", "cope", "rope"],
        themes: &["incel"],
    },
    ThemeBucket {
        triggers: &["accelerat", "collapse", "burn it down", "system", "revolution"],
        themes: &["accelerationism", "extremism"],
    },
    ThemeBucket {
        triggers: &["weapon", "gun", "kill", "attack", "violence", "hurt", "hate them"],
        themes: &["violence", "threats"],
    },
    ThemeBucket {
        triggers: &["alone", "lonely", "no friends", "isolation", "rotting"],
        themes: &["isolation", "loneliness"],
    },
    ThemeBucket {
        triggers: &["no hope", "pointless", "why try", "give up", "it's over"],
        themes: &["hopelessness", "depression"],
    },
    ThemeBucket {
        triggers: &["meaningless", "pointless", "nothing matters", "nihil"],
        themes: &["nihilism"],
    },
];
