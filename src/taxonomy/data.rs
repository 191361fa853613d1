//! Built-in bike and scooter taxonomy.

use crate::model::DamageKind as D;
use crate::model::VehicleType;

/// Section layout: `(section, [(group, [parts])])`.
type Layout = &'static [(&'static str, &'static [(&'static str, &'static [&'static str])])];

pub(super) const PART_DAMAGES: &[(&str, &[D])] = &[
    // Structural metal
    ("center_stand", &[D::Bend, D::Crack, D::Missing]),
    ("side_stand", &[D::Bend, D::Crack, D::Missing]),
    ("left_leg_guard", &[D::Bend, D::Dent, D::Crack, D::Scratch, D::Detached, D::Destroyed]),
    ("right_leg_guard", &[D::Bend, D::Dent, D::Crack, D::Scratch, D::Detached, D::Destroyed]),
    ("grab_rail", &[D::Bend, D::Crack, D::Missing, D::Destroyed, D::Scratch]),
    ("left_handlebar", &[D::Bend, D::Dent, D::Crack, D::Detached, D::Scratch, D::Destroyed]),
    ("right_handlebar", &[D::Bend, D::Dent, D::Crack, D::Detached, D::Scratch, D::Destroyed]),
    // Engine
    ("engine_block", &[D::Crack, D::Scratch, D::Destroyed]),
    // Brakes
    ("front_brake", &[D::Crack, D::Scratch, D::Missing, D::Destroyed, D::Bend]),
    ("rear_brake", &[D::Crack, D::Scratch, D::Missing, D::Destroyed, D::Bend]),
    // Indicators
    ("front_indicator_left", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_indicator_right", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("rear_indicator_left", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("rear_indicator_right", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_indicator", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("rear_indicator", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    // Fuel tank
    ("fuel_tank", &[D::Dent, D::Crack, D::Scratch, D::Destroyed]),
    // Exhaust
    ("exhaust", &[D::Dent, D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    // Fairings and panels
    ("front_fairing", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_mudguard", &[D::Dent, D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("rear_mudguard", &[D::Dent, D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("left_panel", &[D::Dent, D::Scratch, D::Detached, D::Missing, D::Destroyed, D::Crack]),
    ("right_panel", &[D::Dent, D::Scratch, D::Detached, D::Missing, D::Destroyed, D::Crack]),
    ("rear_cowl", &[D::Dent, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    // Number plates
    ("front_number_plate", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    ("rear_number_plate", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    // Suspension
    ("front_suspension", &[D::Bend, D::Crack, D::Scratch, D::Missing, D::Destroyed]),
    ("rear_suspension", &[D::Bend, D::Crack, D::Scratch, D::Missing, D::Destroyed]),
    // Wheels
    ("front_wheel", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("rear_wheel", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    // Footrests
    ("left_footrest", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    ("right_footrest", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    // Mirrors
    ("left_mirror", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    ("right_mirror", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing]),
    // Scooter body
    ("crash_guard", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("floorboard", &[D::Dent, D::Bend, D::Crack, D::Scratch, D::Destroyed]),
    ("front_apron", &[D::Dent, D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_cover_panel", &[D::Bend, D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_cowl", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("front_shield_left", &[D::Dent, D::Crack, D::Scratch, D::Detached, D::Destroyed]),
    ("front_shield_right", &[D::Dent, D::Crack, D::Scratch, D::Detached, D::Destroyed]),
    ("underseat_storage", &[D::Crack, D::Exposed, D::Destroyed]),
    // Electrical
    ("headlamp", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("tail_lamp", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("speedometer", &[D::Crack, D::Scratch, D::Detached, D::Missing, D::Destroyed]),
    ("internal_wiring", &[D::Exposed, D::Destroyed]),
    // Seat
    ("seat", &[D::Torn, D::Cut, D::Detached, D::Missing, D::Destroyed]),
];

const SCOOTER: Layout = &[
    (
        "front",
        &[
            (
                "steering_and_controls",
                &[
                    "left_handlebar",
                    "right_handlebar",
                    "internal_wiring",
                    "handlebar",
                    "front_cowl",
                    "speedometer",
                ],
            ),
            (
                "front_bodywork",
                &[
                    "front_fairing",
                    "front_apron",
                    "headlamp",
                    "front_indicator",
                    "left_mirror",
                    "right_mirror",
                    "front_shield_left",
                    "front_mudguard",
                    "front_shield_right",
                    "front_number_plate",
                ],
            ),
            ("wheel", &["front_wheel", "front_suspension"]),
        ],
    ),
    (
        "center",
        &[
            ("rider_interface", &["seat"]),
            (
                "floorboard_and_frame",
                &[
                    "floorboard",
                    "front_cover_panel",
                    "left_panel",
                    "right_panel",
                    "left_footrest",
                    "right_footrest",
                ],
            ),
            ("fuel_and_storage", &["underseat_storage"]),
        ],
    ),
    (
        "rear",
        &[
            ("wheel", &["rear_wheel", "rear_suspension"]),
            (
                "rear_bodywork",
                &[
                    "rear_cowl",
                    "tail_lamp",
                    "rear_indicator",
                    "rear_number_plate",
                    "grab_rail",
                ],
            ),
        ],
    ),
    ("external", &[("external_protrusions", &["exhaust"])]),
    ("safety", &[("safety_and_auxiliary", &["crash_guard", "windshield"])]),
];

const BIKE: Layout = &[
    (
        "front",
        &[
            (
                "steering_and_controls",
                &[
                    "left_handlebar",
                    "right_handlebar",
                    "speedometer",
                    "internal_wiring",
                ],
            ),
            (
                "front_bodywork",
                &[
                    "front_fairing",
                    "headlamp",
                    "front_indicator_left",
                    "front_indicator_right",
                    "mirror_left",
                    "mirror_right",
                    "front_number_plate",
                    "front_mudguard",
                    "front_suspension",
                    "front_wheel",
                    "front_brake",
                ],
            ),
        ],
    ),
    (
        "center",
        &[
            ("rider_interface", &["seat"]),
            (
                "fuel_and_frame",
                &[
                    "fuel_tank",
                    "leg_guard_left",
                    "leg_guard_right",
                    "left_panel",
                    "right_panel",
                ],
            ),
            (
                "controls_and_mounts",
                &[
                    "left_footrest",
                    "right_footrest",
                    "side_stand",
                    "center_stand",
                ],
            ),
        ],
    ),
    ("engine", &[("engine_and_transmission", &["engine_block"])]),
    (
        "rear",
        &[
            ("suspension_and_mounts", &["rear_suspension"]),
            ("wheel_and_brake", &["rear_wheel", "rear_brake"]),
            (
                "rear_bodywork",
                &[
                    "rear_cowl",
                    "tail_lamp",
                    "rear_indicator_left",
                    "rear_indicator_right",
                    "number_plate_bracket",
                    "grab_rail",
                    "rear_mudguard",
                    "exhaust",
                ],
            ),
        ],
    ),
];

pub(super) fn layout(vehicle: VehicleType) -> Layout {
    match vehicle {
        VehicleType::Bike => BIKE,
        VehicleType::Scooter => SCOOTER,
    }
}
