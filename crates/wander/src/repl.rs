//! Terminal input: search queries and slash commands.

use wander_atlas::{LngLat, Viewport, MAX_ZOOM};

pub const HELP: &str = "\
Type a place or describe what you are looking for.
  /clear                     remove markers
  /markers                   list markers
  /locate <lon> <lat>        use a location fix
  /deny                      refuse location access
  /view <lon> <lat> [zoom]   move the map
  /help                      show this help
  /quit, /exit               exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input<'a> {
    Query(&'a str),
    Clear,
    Markers,
    Locate(LngLat),
    Deny,
    View(Viewport),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Query(line);
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        match (name, args.as_slice()) {
            ("clear", []) => Self::Clear,
            ("markers", []) => Self::Markers,
            ("deny", []) => Self::Deny,
            ("quit" | "exit", []) => Self::Quit,
            ("help", []) => Self::Help,
            ("locate", [lon, lat]) => match coordinate(lon, lat) {
                Ok(fix) => Self::Locate(fix),
                Err(e) => Self::Invalid(e),
            },
            ("view", [lon, lat, rest @ ..]) if rest.len() <= 1 => {
                let center = match coordinate(lon, lat) {
                    Ok(center) => center,
                    Err(e) => return Self::Invalid(e),
                };
                let zoom = match rest.first().map(|z| z.parse::<f64>()) {
                    None => Viewport::default().zoom,
                    Some(Ok(z)) if (0.0..=MAX_ZOOM).contains(&z) => z,
                    Some(_) => return Self::Invalid(format!("zoom must be between 0 and {MAX_ZOOM}")),
                };
                Self::View(Viewport { center, zoom })
            }
            _ => Self::Invalid(format!("unknown command: /{command}")),
        }
    }
}

fn coordinate(lon: &str, lat: &str) -> Result<LngLat, String> {
    let (Ok(lon), Ok(lat)) = (lon.parse::<f64>(), lat.parse::<f64>()) else {
        return Err("coordinates must be numbers".into());
    };
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err("coordinates out of range".into());
    }
    Ok(LngLat::new(lon, lat))
}
