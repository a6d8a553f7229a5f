// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use logfacade::Backend;
use logfacade::Format;
use logfacade::Formatter;
use logfacade::Logger;

fn main() -> Result<(), logfacade::Error> {
    let logger = Logger::new(Backend::Logfmt, Formatter::default())?;
    logger.set_tag("switcher");
    logger.set_time_utc(true);

    for format in [Format::Logfmt, Format::Json, Format::Text] {
        logger.set_format(format)?;
        logger.info(format!("now writing {format}"))?;
    }

    logger.set_time_stamp(true);
    logger.set_time_stamp_level_name("milli")?;
    logger.set_format_name("json")?;
    logger.info("with a millisecond stamp")?;

    // syslog needs a connection, so this fails and json stays active
    if let Err(err) = logger.set_format(Format::Syslog) {
        logger.warn(format!("switch refused: {}", err.message()))?;
    }
    logger.close()
}
