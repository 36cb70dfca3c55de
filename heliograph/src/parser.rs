use nom::combinator::rest;
use nom::number::complete::{be_u16, be_u64, be_u8};
use nom::IResult;

use crate::frame::{
    ApiFrame, FrameError, TransmitOptions, TransmitRequest, TransmitStatus, API_RECEIVE,
    API_TRANSMIT_REQUEST, API_TRANSMIT_STATUS,
};
use crate::wire::{ReceiveFrame, MAX_RF_DATA_LEN};

fn parse_transmit_request(i: &[u8]) -> IResult<&[u8], (u8, u64, u8, u8, &[u8])> {
    let (i, frame_id) = be_u8(i)?;
    let (i, dest_addr) = be_u64(i)?;
    let (i, _reserved) = be_u16(i)?;
    let (i, broadcast_radius) = be_u8(i)?;
    let (i, options) = be_u8(i)?;
    let (i, payload) = rest(i)?;
    Ok((i, (frame_id, dest_addr, broadcast_radius, options, payload)))
}

fn parse_transmit_status(i: &[u8]) -> IResult<&[u8], TransmitStatus> {
    let (i, frame_id) = be_u8(i)?;
    let (i, _reserved) = be_u16(i)?;
    let (i, retry_count) = be_u8(i)?;
    let (i, delivery_status) = be_u8(i)?;
    let (i, discovery_status) = be_u8(i)?;
    Ok((
        i,
        TransmitStatus {
            frame_id,
            retry_count,
            delivery_status,
            discovery_status,
        },
    ))
}

fn parse_receive(i: &[u8]) -> IResult<&[u8], (u64, u8, &[u8])> {
    let (i, source_addr) = be_u64(i)?;
    let (i, _reserved) = be_u16(i)?;
    let (i, recv_opts) = be_u8(i)?;
    let (i, rf_data) = rest(i)?;
    Ok((i, (source_addr, recv_opts, rf_data)))
}

/// Decodes one checksum-verified frame body into its typed form.
pub(crate) fn api_frame(body: &[u8]) -> Result<ApiFrame, FrameError> {
    let (rest, api_type) = be_u8::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|_| FrameError::Malformed)?;
    match api_type {
        API_TRANSMIT_REQUEST => {
            let (_, (frame_id, dest_addr, broadcast_radius, options, payload)) =
                parse_transmit_request(rest).map_err(|_| FrameError::Malformed)?;
            if payload.len() > MAX_RF_DATA_LEN {
                return Err(FrameError::Oversize(payload.len() as u16));
            }
            let mut request = TransmitRequest::new(dest_addr, frame_id, payload)?;
            request.broadcast_radius = broadcast_radius;
            request.options = TransmitOptions::from(options);
            Ok(ApiFrame::TransmitRequest(request))
        }
        API_TRANSMIT_STATUS => {
            let (_, status) =
                parse_transmit_status(rest).map_err(|_| FrameError::Malformed)?;
            Ok(ApiFrame::TransmitStatus(status))
        }
        API_RECEIVE => {
            let (_, (source_addr, recv_opts, rf_data)) =
                parse_receive(rest).map_err(|_| FrameError::Malformed)?;
            if rf_data.len() > MAX_RF_DATA_LEN {
                return Err(FrameError::Oversize(rf_data.len() as u16));
            }
            let frame = ReceiveFrame::new(source_addr, recv_opts, rf_data)
                .map_err(|_| FrameError::Malformed)?;
            Ok(ApiFrame::Receive(frame))
        }
        other => Err(FrameError::UnknownApiType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_request_body_parses() {
        let mut body = vec![0x10, 0x01];
        body.extend_from_slice(&0x0102030405060708u64.to_be_bytes());
        body.extend_from_slice(&[0xff, 0xfe, 0x00, 0xc0, 0xde, 0xad]);

        match api_frame(&body) {
            Ok(ApiFrame::TransmitRequest(request)) => {
                assert_eq!(request.frame_id, 0x01);
                assert_eq!(request.dest_addr, 0x0102030405060708);
                assert_eq!(request.options.mode(), 0x3);
                assert_eq!(&request.payload[..], &[0xde, 0xad]);
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn short_status_body_is_malformed() {
        assert_eq!(api_frame(&[0x8b, 0x01, 0xff]), Err(FrameError::Malformed));
    }

    #[test]
    fn receive_body_longer_than_payload_limit_is_rejected() {
        let mut body = vec![0x90];
        body.extend_from_slice(&0xbeefu64.to_be_bytes());
        body.extend_from_slice(&[0xff, 0xfe, 0x00]);
        body.extend_from_slice(&[0x55; 9]);
        assert_eq!(api_frame(&body), Err(FrameError::Oversize(9)));
    }
}
