//! Unit codes used by abscissa and ordinate fields.

/// Look up the `(quantity, unit)` names for a unit code.
pub const fn lookup(code: i32) -> Option<(&'static str, &'static str)> {
    Some(match code {
        0 => ("None", "U"),
        1 => ("Time", "sec"),
        2 => ("Delay", "sec"),
        3 => ("Frequency", "Hz"),
        4 => ("Time code", "sec"),
        5 => ("Distance", "m"),
        6 => ("Velocity", "m/sec"),
        7 => ("Acceleration", "m/sec^2"),
        8 => ("Jerk", "m/sec^3"),
        9 => ("Doppler", "Hz"),
        10 => ("Doppler rate", "Hz/sec"),
        11 => ("Energy", "J"),
        12 => ("Power", "W"),
        13 => ("Mass", "g"),
        14 => ("Volume", "l"),
        15 => ("Angular power density", "W/ster"),
        16 => ("Integrated power density", "W/rad"),
        17 => ("Spatial power density", "W/m^2"),
        18 => ("Integrated power density", "W/m"),
        19 => ("Spectral power density", "W/MHz"),
        20 => ("Amplitude", "U"),
        21 => ("Real", "U"),
        22 => ("Imaginary", "U"),
        23 => ("Phase", "rad"),
        24 => ("Phase", "deg"),
        25 => ("Phase", "cycles"),
        26 => ("10*Log", "U"),
        27 => ("20*Log", "U"),
        28 => ("Magnitude", "U"),
        29 | 30 => ("Unknown", "U"),
        31 => ("General dimensionless", "U"),
        32 => ("Counts", "U"),
        33 => ("Angle", "rad"),
        34 => ("Angle", "deg"),
        35 => ("Relative power", "dB"),
        36 => ("Relative power", "dBm"),
        37 => ("Relative power", "dBW"),
        38 => ("Solid angle", "ster"),
        _ => return None,
    })
}
